//! Router-level test harness: the real application wired to two wiremock
//! servers, one standing in for the identity provider and one for Graph.

use crate::config::Settings;
use crate::create_app;
use crate::state::AppState;
use axum::{body::Body, Router};
use http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

/// Graph mock serves under this prefix, like the real `/v1.0` endpoint
pub const GRAPH_PREFIX: &str = "/v1.0";

/// The gateway under test plus the servers it talks to.
///
/// Configured tenants are `contoso` (active, directory `contoso-id`) and
/// `fabrikam` (inactive). Nothing answers on the login server until a token
/// endpoint is mounted:
///
/// ```rust
/// let fixture = TestFixture::new().await;
/// fixture.mount_token_endpoint("contoso-id", 3600).await;
/// Mock::given(matchers::path(format!("{GRAPH_PREFIX}/users/u1")))
///     .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u1" })))
///     .mount(&fixture.graph_mock)
///     .await;
/// fixture.get("/api/o365/contoso/users/u1").await.assert_ok();
/// ```
pub struct TestFixture {
    pub app: Router,
    pub settings: Settings,
    pub login_mock: MockServer,
    pub graph_mock: MockServer,
}

impl TestFixture {
    pub async fn new() -> Self {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();

        let (login_mock, graph_mock) = tokio::join!(MockServer::start(), MockServer::start());
        let settings = Settings::for_test_with_mocks(&login_mock, &graph_mock);
        let app = create_app(AppState::for_testing(&settings));

        Self {
            app,
            settings,
            login_mock,
            graph_mock,
        }
    }

    fn token_path(tenant_id: &str) -> String {
        format!("/{tenant_id}/oauth2/v2.0/token")
    }

    /// Hand out `token-<tenant_id>` for client-credential grants of the tenant
    pub async fn mount_token_endpoint(&self, tenant_id: &str, expires_in: u64) {
        let body = json!({
            "token_type": "Bearer",
            "expires_in": expires_in,
            "access_token": format!("token-{tenant_id}"),
        });
        Mock::given(matchers::method("POST"))
            .and(matchers::path(Self::token_path(tenant_id)))
            .and(matchers::body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.login_mock)
            .await;
    }

    /// Answer the tenant's grants with an `invalid_client` rejection
    pub async fn mount_rejected_token_endpoint(&self, tenant_id: &str) {
        let body = json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided.",
        });
        Mock::given(matchers::method("POST"))
            .and(matchers::path(Self::token_path(tenant_id)))
            .respond_with(ResponseTemplate::new(401).set_body_json(body))
            .mount(&self.login_mock)
            .await;
    }

    /// Request carrying the operator key, for cases that need the raw response
    pub fn request_builder(&self, method: Method, uri: impl AsRef<str>) -> http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.settings.api_key))
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Vec<u8>>) -> TestResponse {
        let builder = self.request_builder(method, uri);
        let request = match body {
            Some(bytes) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(bytes)),
            None => builder.body(Body::empty()),
        }
        .expect("request should be well formed");
        self.send(request).await
    }

    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        self.request(Method::GET, uri.as_ref(), None).await
    }

    pub async fn delete(&self, uri: impl AsRef<str>) -> TestResponse {
        self.request(Method::DELETE, uri.as_ref(), None).await
    }

    pub async fn post<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        let bytes = serde_json::to_vec(body).expect("body should serialize");
        self.request(Method::POST, uri.as_ref(), Some(bytes)).await
    }

    pub async fn patch<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        let bytes = serde_json::to_vec(body).expect("body should serialize");
        self.request(Method::PATCH, uri.as_ref(), Some(bytes)).await
    }

    /// Drive one request through the router in-process
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        TestResponse::read(response).await
    }
}

/// Status and decoded body. Bodies that are empty or not JSON decode to `{}`.
pub struct TestResponse {
    pub status: StatusCode,
    pub json: Value,
}

impl TestResponse {
    async fn read(response: axum::response::Response) -> Self {
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("response body should be readable")
            .to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({}));
        Self { status, json }
    }

    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "unexpected status, body: {}",
            self.json
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("body should match the expected type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_engine::models::GraphUser;

    #[tokio::test]
    async fn test_throttled_graph_maps_to_service_unavailable() {
        let fixture = TestFixture::new().await;
        fixture.mount_token_endpoint("contoso-id", 3600).await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path(format!("{GRAPH_PREFIX}/users/u1")))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .expect(3)
            .mount(&fixture.graph_mock)
            .await;

        let response = fixture.get("/api/o365/contoso/users/u1").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_rejected_credentials_map_to_bad_gateway() {
        let fixture = TestFixture::new().await;
        fixture.mount_rejected_token_endpoint("contoso-id").await;

        let response = fixture.get("/api/o365/contoso/users/u1").await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        assert_eq!(response.json["code"], "invalid_client");
        assert!(fixture.graph_mock.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_token_is_reused_across_requests() {
        let fixture = TestFixture::new().await;
        fixture.mount_token_endpoint("contoso-id", 3600).await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path(format!("{GRAPH_PREFIX}/users/u1")))
            .and(matchers::header("Authorization", "Bearer token-contoso-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u1" })))
            .expect(3)
            .mount(&fixture.graph_mock)
            .await;

        for _ in 0..3 {
            let response = fixture.get("/api/o365/contoso/users/u1").await;
            response.assert_ok();
            assert_eq!(response.json_as::<GraphUser>().id, "u1");
        }

        let token_requests = fixture.login_mock.received_requests().await.unwrap();
        assert_eq!(token_requests.len(), 1);
    }
}
