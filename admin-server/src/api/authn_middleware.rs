use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::warn;

const INVALID_KEY_MESSAGE: &str = "Invalid operator API key";

/// The key presented as `Authorization: Bearer <key>`, scheme matched case-insensitively
fn presented_key(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::new("Missing Authorization header", http::StatusCode::UNAUTHORIZED))?;

    let forbidden = || ApiError::new(INVALID_KEY_MESSAGE, http::StatusCode::FORBIDDEN);
    let value = value.to_str().map_err(|e| {
        warn!("Authorization header is not valid ASCII: {}", e);
        forbidden()
    })?;

    match value.split_once(' ') {
        Some((scheme, key)) if scheme.eq_ignore_ascii_case("bearer") && !key.trim().is_empty() => {
            Ok(key.trim())
        }
        _ => {
            warn!("Authorization header does not carry a bearer key");
            Err(forbidden())
        }
    }
}

/// Rejects requests that do not present the operator API key
pub(super) async fn authentication_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match presented_key(request.headers()) {
        Ok(key) if key == state.settings.api_key => next.run(request).await,
        Ok(_) => {
            warn!(
                "Rejected {} {}: wrong operator API key",
                request.method(),
                request.uri().path()
            );
            ApiError::new(INVALID_KEY_MESSAGE, http::StatusCode::FORBIDDEN).into_response()
        }
        Err(err) => err.into_response(),
    }
}
