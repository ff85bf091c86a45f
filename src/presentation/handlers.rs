// HTTP request handlers
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct GuestTokenQuery {
    #[serde(rename = "departmentId")]
    pub department_id: Option<String>,
    pub username: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Departments the front-end offers as tabs
pub async fn list_departments(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.departments.clone())
}

/// Guest token plus embed URLs for one department
pub async fn guest_token(
    Query(query): Query<GuestTokenQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let department_id = match query.department_id.as_deref().map(str::trim).map(str::parse::<i64>) {
        Some(Ok(id)) => id,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "departmentId must be an integer" })),
            )
                .into_response();
        }
    };

    let issued_at = chrono::Utc::now().timestamp();
    match state
        .guest_tokens
        .issue(department_id, query.username.as_deref(), issued_at)
    {
        Ok(issued) => Json(issued).into_response(),
        Err(e) => {
            tracing::error!("Error issuing guest token for department {}: {:#}", department_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to issue guest token" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::application::guest_token_service::GuestTokenService;
    use crate::domain::guest_token::{GuestTokenClaims, default_departments};
    use crate::infrastructure::config::{EmbedSettings, ServerSettings};
    use crate::infrastructure::token_signer::HmacTokenSigner;
    use crate::presentation::app_state::AppState;
    use crate::presentation::routes::router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let settings = EmbedSettings::default();
        let signer = Arc::new(HmacTokenSigner::new(&settings.secret_key));
        let state = Arc::new(AppState {
            guest_tokens: GuestTokenService::new(signer, settings, "http://localhost:8088"),
            departments: default_departments(),
        });
        router(state, &ServerSettings::default()).unwrap()
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_departments() {
        let (status, body) = get("/api/superset/departments").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], 101);
        assert_eq!(body[0]["expectedTotal"], "¥955,000");
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_guest_token_for_department() {
        let (status, body) = get("/api/superset/guest-token?departmentId=102").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["departmentId"], 102);
        assert_eq!(body["username"], "Department 102 user");
        assert_eq!(body["dashboardUrl"], "http://localhost:8088/dashboard/12/embedded");
        assert!(body["embedUrl"].as_str().unwrap().ends_with("&standalone=true"));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["http://superset:8088/"]);
        let claims = decode::<GuestTokenClaims>(
            body["token"].as_str().unwrap(),
            &DecodingKey::from_secret(b"TEST_NON_DEV_SECRET"),
            &validation,
        )
        .unwrap()
        .claims;
        assert_eq!(claims.rls_rules[0].clause, "department_id = 102");
    }

    #[tokio::test]
    async fn test_guest_token_rejects_bad_department() {
        let (status, body) = get("/api/superset/guest-token?departmentId=sales").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = get("/api/superset/guest-token").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cors_allows_front_end_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .header(header::ORIGIN, "http://localhost:4200")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:4200"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
