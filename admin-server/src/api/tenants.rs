use crate::api::resolve_tenant;
use crate::errors::ApiError;
use crate::models::TenantSummary;
use crate::openapi::TENANTS_TAG;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use graph_engine::models::CredentialCheck;
use log::info;

#[utoipa::path(
    get,
    path = "/api/tenants",
    tag = TENANTS_TAG,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Configured tenants", body = [TenantSummary])
    )
)]
pub(crate) async fn list_tenants(State(state): State<AppState>) -> Json<Vec<TenantSummary>> {
    let summaries = state
        .tenants
        .tenants()
        .into_iter()
        .map(|tenant| TenantSummary {
            token_cached: state.graph.tokens().contains(&tenant.tenant_id),
            key: tenant.key,
            display_name: tenant.display_name,
            tenant_id: tenant.tenant_id,
            is_active: tenant.is_active,
        })
        .collect();
    Json(summaries)
}

/// Exchange the tenant's credentials for a fresh token
#[utoipa::path(
    post,
    path = "/api/tenants/{tenant}/validate",
    tag = TENANTS_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    responses(
        (status = 200, description = "Validation outcome", body = CredentialCheck),
        (status = 400, description = "Tenant is not active"),
        (status = 404, description = "Tenant not found")
    )
)]
pub(crate) async fn validate_tenant(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<CredentialCheck>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    let check = state.graph.validate_credentials(&credential).await;
    info!(
        "Credentials of tenant '{}' validated: {}",
        tenant,
        if check.valid { "valid" } else { "invalid" }
    );
    Ok(Json(check))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tenants", get(list_tenants))
        .route("/api/tenants/{tenant}/validate", post(validate_tenant))
}
