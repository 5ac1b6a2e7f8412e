use axum::response::IntoResponse;
use axum::Json;
use graph_engine::{GraphError, TokenError};
use http::StatusCode;
use log::{error, warn};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub detail: String,
    pub status_code: StatusCode,
    /// Error code reported by Graph or the identity provider
    pub code: Option<String>,
}

impl ApiError {
    /// Create a new ApiError with a detail message and status code
    pub fn new<S: ToString>(detail: S, status_code: StatusCode) -> Self {
        Self {
            detail: detail.to_string(),
            status_code,
            code: None,
        }
    }

    pub fn with_code<S: ToString>(mut self, code: S) -> Self {
        self.code = Some(code.to_string());
        self
    }

    /// Create new Bad Request Error (400) with a detail message
    pub fn bad_request<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_REQUEST)
    }

    /// Create new Not Found Error (404) with a detail message
    pub fn not_found<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::NOT_FOUND)
    }

    /// Create new Bad Gateway (502) with a detail message
    pub fn bad_gateway<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_GATEWAY)
    }

    /// Create new Service Unavailable (503) with a detail message
    pub fn service_unavailable<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::SERVICE_UNAVAILABLE)
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        match &err {
            GraphError::TenantNotFound(_) => ApiError::not_found(&err),
            GraphError::TenantInactive(_) => ApiError::bad_request(&err),
            GraphError::InvalidRequest(_) => ApiError::bad_request(&err),
            GraphError::Authentication(token_error) => {
                warn!("{}", err);
                let api_error = ApiError::bad_gateway(&err);
                match token_error.as_ref() {
                    TokenError::Rejected { code, .. } => api_error.with_code(code),
                    _ => api_error,
                }
            }
            GraphError::Transient { status, .. } => {
                warn!("{}", err);
                if *status == Some(429) {
                    ApiError::service_unavailable(&err)
                } else {
                    ApiError::bad_gateway(&err)
                }
            }
            GraphError::Unauthorized(provider) => {
                error!("{}", err);
                ApiError::bad_gateway(&err).with_code(&provider.code)
            }
            GraphError::Client { status, error } => {
                let status_code =
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                ApiError::new(&error.message, status_code).with_code(&error.code)
            }
            GraphError::Decode(_) => {
                error!("{}", err);
                ApiError::bad_gateway(&err)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = match self.code {
            Some(code) => json!({
                "detail": self.detail,
                "code": code,
            }),
            None => json!({
                "detail": self.detail,
            }),
        };
        (status_code, Json(body)).into_response()
    }
}
