use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    /// Configured tenants
    tenants: usize,
    /// Tenants that may be used for Graph calls
    active_tenants: usize,
    /// Tenants currently holding a cached token
    cached_tokens: u64,
}

/// Liveness plus a view of the tenant registry and token cache
#[utoipa::path(
    get,
    path = "/api/health",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub(crate) async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let tenants = state.tenants.tenants();
    Json(HealthResponse {
        status: "healthy".to_string(),
        active_tenants: tenants.iter().filter(|tenant| tenant.is_active).count(),
        tenants: tenants.len(),
        cached_tokens: state.graph.tokens().len().await,
    })
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}
