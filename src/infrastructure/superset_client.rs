// Superset REST client - authenticated session over reqwest
use crate::application::superset_api::{ListQuery, SupersetApi};
use crate::domain::chart::{ChartSummary, NewChart};
use crate::domain::dashboard::{DashboardDetail, DashboardSummary, DashboardUpdate, NewDashboard};
use crate::domain::dataset::{DatabaseSummary, DatasetSummary, NewVirtualDataset};
use crate::infrastructure::api_error::SupersetError;
use crate::infrastructure::config::SupersetSettings;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, REFERER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrftoken");

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    provider: &'a str,
    refresh: bool,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CsrfResponse {
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    result: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ItemResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: i64,
}

/// A logged-in Superset session. Every request carries the bearer token,
/// the CSRF token and a Referer; cookies persist across requests.
#[derive(Debug, Clone)]
pub struct SupersetClient {
    http: reqwest::Client,
    base_url: String,
    session_headers: HeaderMap,
}

impl SupersetClient {
    pub async fn login(settings: &SupersetSettings) -> Result<Self, SupersetError> {
        let base_url = settings.base_url().to_string();
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(SupersetError::Client)?;

        let response = http
            .post(format!("{base_url}/api/v1/security/login"))
            .json(&LoginRequest {
                username: &settings.username,
                password: &settings.password,
                provider: &settings.provider,
                refresh: true,
            })
            .send()
            .await
            .map_err(|source| SupersetError::Transport { operation: "login", source })?;
        let login: LoginResponse = expect_json("login", response, StatusCode::OK).await?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", login.access_token))?;

        let csrf_token = fetch_csrf_token(&http, &base_url, &bearer).await;

        let mut session_headers = HeaderMap::new();
        session_headers.insert(AUTHORIZATION, bearer);
        session_headers.insert(CSRF_HEADER, HeaderValue::from_str(&csrf_token)?);
        session_headers.insert(REFERER, HeaderValue::from_str(&base_url)?);

        tracing::info!("Logged in to {} as {}", base_url, settings.username);
        Ok(Self {
            http,
            base_url,
            session_headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn list_request(&self, path: &str, query: &ListQuery) -> RequestBuilder {
        let request = self.http.get(self.url(path));
        if query.is_empty() {
            request
        } else {
            request.query(&[("q", query.to_param())])
        }
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<Response, SupersetError> {
        let response = request
            .headers(self.session_headers.clone())
            .send()
            .await
            .map_err(|source| SupersetError::Transport { operation, source })?;
        tracing::debug!("{} -> {}", operation, response.status());
        expect_status(operation, response, expected).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<T, SupersetError> {
        let response = self.send(operation, request, expected).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| SupersetError::Decode { operation, source })
    }

    async fn create<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<i64, SupersetError> {
        let created: CreatedResponse = self
            .fetch(operation, self.http.post(self.url(path)).json(body), StatusCode::CREATED)
            .await?;
        Ok(created.id)
    }
}

/// A failed CSRF lookup leaves the token empty; Superset rejects the first
/// mutating call in that case, which surfaces as a status error there.
async fn fetch_csrf_token(http: &reqwest::Client, base_url: &str, bearer: &HeaderValue) -> String {
    let response = http
        .get(format!("{base_url}/api/v1/security/csrf_token/"))
        .header(AUTHORIZATION, bearer.clone())
        .send()
        .await;

    match response {
        Ok(response) if response.status() == StatusCode::OK => response
            .json::<CsrfResponse>()
            .await
            .ok()
            .and_then(|csrf| csrf.result)
            .unwrap_or_default(),
        Ok(response) => {
            tracing::warn!("CSRF token request failed with status {}", response.status());
            String::new()
        }
        Err(e) => {
            tracing::warn!("CSRF token request failed: {}", e);
            String::new()
        }
    }
}

async fn expect_status(
    operation: &'static str,
    response: Response,
    expected: StatusCode,
) -> Result<Response, SupersetError> {
    let status = response.status();
    if status != expected {
        let body = response.text().await.unwrap_or_default();
        return Err(SupersetError::UnexpectedStatus { operation, status, body });
    }
    Ok(response)
}

async fn expect_json<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
    expected: StatusCode,
) -> Result<T, SupersetError> {
    expect_status(operation, response, expected)
        .await?
        .json::<T>()
        .await
        .map_err(|source| SupersetError::Decode { operation, source })
}

#[async_trait]
impl SupersetApi for SupersetClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>> {
        let list: ListResponse<DatabaseSummary> = self
            .fetch("list databases", self.http.get(self.url("/api/v1/database/")), StatusCode::OK)
            .await?;
        Ok(list.result)
    }

    async fn list_datasets(&self, query: &ListQuery) -> Result<Vec<DatasetSummary>> {
        let list: ListResponse<DatasetSummary> = self
            .fetch("list datasets", self.list_request("/api/v1/dataset/", query), StatusCode::OK)
            .await?;
        Ok(list.result)
    }

    async fn create_dataset(&self, dataset: &NewVirtualDataset) -> Result<i64> {
        Ok(self.create("create dataset", "/api/v1/dataset/", dataset).await?)
    }

    async fn refresh_dataset(&self, dataset_id: i64) -> Result<()> {
        let request = self.http.put(self.url(&format!("/api/v1/dataset/{dataset_id}/refresh")));
        self.send("refresh dataset", request, StatusCode::OK).await?;
        Ok(())
    }

    async fn delete_dataset(&self, dataset_id: i64) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/api/v1/dataset/{dataset_id}")));
        self.send("delete dataset", request, StatusCode::OK).await?;
        Ok(())
    }

    async fn list_charts(&self, query: &ListQuery) -> Result<Vec<ChartSummary>> {
        let list: ListResponse<ChartSummary> = self
            .fetch("list charts", self.list_request("/api/v1/chart/", query), StatusCode::OK)
            .await?;
        Ok(list.result)
    }

    async fn create_chart(&self, chart: &NewChart) -> Result<i64> {
        Ok(self.create("create chart", "/api/v1/chart/", chart).await?)
    }

    async fn delete_chart(&self, chart_id: i64) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/api/v1/chart/{chart_id}")));
        self.send("delete chart", request, StatusCode::OK).await?;
        Ok(())
    }

    async fn list_dashboards(&self) -> Result<Vec<DashboardSummary>> {
        let list: ListResponse<DashboardSummary> = self
            .fetch("list dashboards", self.http.get(self.url("/api/v1/dashboard/")), StatusCode::OK)
            .await?;
        Ok(list.result)
    }

    async fn get_dashboard(&self, dashboard_id: i64) -> Result<DashboardDetail> {
        let request = self.http.get(self.url(&format!("/api/v1/dashboard/{dashboard_id}")));
        let item: ItemResponse<DashboardDetail> = self.fetch("get dashboard", request, StatusCode::OK).await?;
        Ok(item.result)
    }

    async fn dashboard_charts(&self, dashboard_id: i64) -> Result<Vec<ChartSummary>> {
        let request = self.http.get(self.url(&format!("/api/v1/dashboard/{dashboard_id}/charts")));
        let list: ListResponse<ChartSummary> = self.fetch("list dashboard charts", request, StatusCode::OK).await?;
        Ok(list.result)
    }

    async fn create_dashboard(&self, dashboard: &NewDashboard) -> Result<i64> {
        Ok(self.create("create dashboard", "/api/v1/dashboard/", dashboard).await?)
    }

    async fn update_dashboard(&self, dashboard_id: i64, update: &DashboardUpdate) -> Result<()> {
        let request = self
            .http
            .put(self.url(&format!("/api/v1/dashboard/{dashboard_id}")))
            .json(update);
        self.send("update dashboard", request, StatusCode::OK).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::api_error::status_of;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(url: String) -> SupersetSettings {
        SupersetSettings {
            url,
            pacing_ms: 0,
            ..SupersetSettings::default()
        }
    }

    fn mock_login(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/security/login")
                .json_body(json!({"username": "admin", "password": "admin", "provider": "db", "refresh": true}));
            then.status(200).json_body(json!({"access_token": "tok-1", "refresh_token": "r"}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/security/csrf_token/")
                .header("authorization", "Bearer tok-1");
            then.status(200)
                .header("set-cookie", "session=abc; Path=/")
                .json_body(json!({"result": "csrf-1"}));
        });
    }

    #[tokio::test]
    async fn test_session_headers_and_cookie_are_sent() {
        let server = MockServer::start();
        mock_login(&server);
        let update = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/v1/dashboard/15")
                .header("authorization", "Bearer tok-1")
                .header("x-csrftoken", "csrf-1")
                .header("referer", server.base_url())
                .header("cookie", "session=abc")
                .json_body(json!({"json_metadata": "{\"cross_filters_enabled\":true}"}));
            then.status(200).json_body(json!({"id": 15}));
        });

        let client = SupersetClient::login(&settings(server.base_url())).await.unwrap();
        let body = DashboardUpdate {
            position_json: None,
            json_metadata: Some("{\"cross_filters_enabled\":true}".to_string()),
        };
        client.update_dashboard(15, &body).await.unwrap();
        update.assert();
    }

    #[tokio::test]
    async fn test_login_failure_reports_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/security/login");
            then.status(401).body("bad credentials");
        });

        let err = SupersetClient::login(&settings(server.base_url())).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(err.to_string().contains("bad credentials"));
    }

    #[tokio::test]
    async fn test_csrf_failure_leaves_empty_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/security/login");
            then.status(200).json_body(json!({"access_token": "tok-2"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/security/csrf_token/");
            then.status(500);
        });
        let charts = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/chart/")
                .header("x-csrftoken", "")
                .query_param("q", r#"{"page_size":10,"order_column":"id","order_direction":"desc"}"#);
            then.status(200).json_body(json!({
                "count": 2,
                "result": [
                    {"id": 133, "slice_name": "Breakdown", "viz_type": "bar"},
                    {"id": 131, "slice_name": "Details"}
                ]
            }));
        });

        let client = SupersetClient::login(&settings(server.base_url())).await.unwrap();
        let result = client.list_charts(&ListQuery::newest_first(10)).await.unwrap();
        charts.assert();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].viz_type.as_deref(), Some("bar"));
        assert_eq!(result[1].viz_type, None);
    }

    #[tokio::test]
    async fn test_create_chart_expects_created() {
        let server = MockServer::start();
        mock_login(&server);
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/chart/")
                .json_body_includes(r#"{"slice_name": "Pie", "viz_type": "pie"}"#);
            then.status(201).json_body(json!({"id": 42, "result": {}}));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/chart/")
                .json_body_includes(r#"{"slice_name": "Broken"}"#);
            then.status(422).json_body(json!({"message": {"params": ["invalid"]}}));
        });

        let client = SupersetClient::login(&settings(server.base_url())).await.unwrap();
        let chart = NewChart {
            slice_name: "Pie".to_string(),
            viz_type: "pie".to_string(),
            datasource_id: 4,
            datasource_type: "table".to_string(),
            params: "{}".to_string(),
        };
        assert_eq!(client.create_chart(&chart).await.unwrap(), 42);

        let broken = NewChart {
            slice_name: "Broken".to_string(),
            ..chart
        };
        let err = client.create_chart(&broken).await.unwrap_err();
        assert_eq!(status_of(&err), Some(StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[tokio::test]
    async fn test_get_dashboard_decodes_embedded_documents() {
        let server = MockServer::start();
        mock_login(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/dashboard/15");
            then.status(200).json_body(json!({
                "result": {
                    "id": 15,
                    "dashboard_title": "Defects",
                    "position_json": "{\"DASHBOARD_VERSION_KEY\": \"v2\"}",
                    "json_metadata": "{\"native_filter_configuration\": []}"
                }
            }));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/chart/132");
            then.status(404).json_body(json!({"message": "Not found"}));
        });

        let client = SupersetClient::login(&settings(server.base_url())).await.unwrap();
        let detail = client.get_dashboard(15).await.unwrap();
        assert_eq!(detail.position_json.as_ref().unwrap()["DASHBOARD_VERSION_KEY"], "v2");
        assert_eq!(detail.metadata().unwrap().native_filter_configuration, Some(vec![]));

        let err = client.delete_chart(132).await.unwrap_err();
        delete.assert();
        assert_eq!(status_of(&err), Some(StatusCode::NOT_FOUND));
    }
}
