mod authn_middleware;
pub(crate) mod domains;
pub(crate) mod health;
pub(crate) mod licenses;
pub(crate) mod reports;
pub(crate) mod roles;
pub(crate) mod tenants;
pub(crate) mod users;

use crate::api::authn_middleware::authentication_middleware;
use crate::errors::ApiError;
use crate::state::AppState;
use axum::{middleware, Router};
use graph_engine::{TenantCredential, TenantRegistry};
use log::debug;
use std::sync::Arc;

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(protected_routes(state))
}

/// Creates a router for protected routes that require API key authentication
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(tenants::router())
        .merge(users::router())
        .merge(licenses::router())
        .merge(domains::router())
        .merge(roles::router())
        .merge(reports::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authentication_middleware,
        ))
}

/// Resolve the `{tenant}` path segment to an active tenant's credentials
pub(crate) async fn resolve_tenant(
    state: &AppState,
    tenant: &str,
) -> Result<Arc<TenantCredential>, ApiError> {
    let credential = state.tenants.resolve(tenant).await?;
    debug!(
        "Resolved tenant '{}' to directory '{}'",
        tenant, credential.tenant_id
    );
    Ok(credential)
}
