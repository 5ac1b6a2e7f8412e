use crate::api::resolve_tenant;
use crate::errors::ApiError;
use crate::models::MessageResponse;
use crate::openapi::ROLES_TAG;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use graph_engine::models::{DirectoryObject, DirectoryRole, RoleAssignment};

#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/roles",
    tag = ROLES_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    responses(
        (status = 200, description = "Activated directory roles", body = [DirectoryRole])
    )
)]
pub(crate) async fn list_roles(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<Vec<DirectoryRole>>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    Ok(Json(state.graph.list_directory_roles(&credential).await?))
}

#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/roles/{id}/members",
    tag = ROLES_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("id" = String, Path, description = "Directory role ID")
    ),
    responses(
        (status = 200, description = "Members of the role", body = [DirectoryObject])
    )
)]
pub(crate) async fn list_role_members(
    State(state): State<AppState>,
    Path((tenant, role_id)): Path<(String, String)>,
) -> Result<Json<Vec<DirectoryObject>>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    Ok(Json(
        state.graph.list_role_members(&credential, &role_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/roles/assign",
    tag = ROLES_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    request_body = RoleAssignment,
    responses(
        (status = 201, description = "Role assigned", body = MessageResponse)
    )
)]
pub(crate) async fn assign_role(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(assignment): Json<RoleAssignment>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    state
        .graph
        .add_role_member(&credential, &assignment.role_id, &assignment.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Role assigned successfully")),
    ))
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/roles/revoke",
    tag = ROLES_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    request_body = RoleAssignment,
    responses(
        (status = 200, description = "Role revoked", body = MessageResponse)
    )
)]
pub(crate) async fn revoke_role(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(assignment): Json<RoleAssignment>,
) -> Result<Json<MessageResponse>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    state
        .graph
        .remove_role_member(&credential, &assignment.role_id, &assignment.user_id)
        .await?;
    Ok(Json(MessageResponse::new("Role revoked successfully")))
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/roles/{id}/promote",
    tag = ROLES_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("id" = String, Path, description = "User object ID")
    ),
    responses(
        (status = 200, description = "User is a Global Administrator", body = MessageResponse),
        (status = 404, description = "Global Administrator role is not activated")
    )
)]
pub(crate) async fn promote_global_admin(
    State(state): State<AppState>,
    Path((tenant, user_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    state
        .graph
        .promote_global_admin(&credential, &user_id)
        .await?;
    Ok(Json(MessageResponse::new(
        "User promoted to Global Administrator",
    )))
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/roles/{id}/demote",
    tag = ROLES_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("id" = String, Path, description = "User object ID")
    ),
    responses(
        (status = 200, description = "User is no longer a Global Administrator", body = MessageResponse)
    )
)]
pub(crate) async fn demote_global_admin(
    State(state): State<AppState>,
    Path((tenant, user_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    state
        .graph
        .demote_global_admin(&credential, &user_id)
        .await?;
    Ok(Json(MessageResponse::new(
        "User demoted from Global Administrator",
    )))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/o365/{tenant}/roles", get(list_roles))
        .route(
            "/api/o365/{tenant}/roles/{id}/members",
            get(list_role_members),
        )
        .route("/api/o365/{tenant}/roles/assign", post(assign_role))
        .route("/api/o365/{tenant}/roles/revoke", post(revoke_role))
        .route(
            "/api/o365/{tenant}/roles/{id}/promote",
            post(promote_global_admin),
        )
        .route(
            "/api/o365/{tenant}/roles/{id}/demote",
            post(demote_global_admin),
        )
}
