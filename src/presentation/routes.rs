// Router for the embedding backend
use crate::infrastructure::config::ServerSettings;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{guest_token, health_check, list_departments};
use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>, server: &ServerSettings) -> anyhow::Result<Router> {
    let origin: HeaderValue = server
        .allowed_origin
        .parse()
        .with_context(|| format!("Invalid allowed origin {}", server.allowed_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Ok(Router::new()
        .route("/healthz", get(health_check))
        .route("/api/superset/departments", get(list_departments))
        .route("/api/superset/guest-token", get(guest_token))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
