use crate::api::resolve_tenant;
use crate::errors::ApiError;
use crate::models::{ListUsersQuery, MessageResponse, SearchQuery};
use crate::openapi::USERS_TAG;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{StreamExt, TryStreamExt};
use graph_engine::models::{BatchItemResult, GraphUser, NewUser, UserPatch};
use log::info;

/// List users, fetching only as many Graph pages as `top` requires
#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/users",
    tag = USERS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ListUsersQuery
    ),
    responses(
        (status = 200, description = "Users of the tenant", body = [GraphUser]),
        (status = 404, description = "Tenant not found")
    )
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<GraphUser>>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    let users: Vec<GraphUser> = state
        .graph
        .list_users(&credential, Some(query.page_size()), query.filter.as_deref())
        .take(query.limit() as usize)
        .try_collect()
        .await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/users/search",
    tag = USERS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        SearchQuery
    ),
    responses(
        (status = 200, description = "Matching users", body = [GraphUser]),
        (status = 400, description = "Empty keyword")
    )
)]
pub(crate) async fn search_users(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<GraphUser>>, ApiError> {
    if query.keyword.trim().is_empty() {
        return Err(ApiError::bad_request("Search keyword must not be empty"));
    }
    let credential = resolve_tenant(&state, &tenant).await?;
    let users = state.graph.search_users(&credential, &query.keyword).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/users/{user_id}",
    tag = USERS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("user_id" = String, Path, description = "User object ID or user principal name")
    ),
    responses(
        (status = 200, description = "The user", body = GraphUser),
        (status = 404, description = "Tenant or user not found")
    )
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    Path((tenant, user_id)): Path<(String, String)>,
) -> Result<Json<GraphUser>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    let user = state.graph.get_user(&credential, &user_id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/users",
    tag = USERS_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = GraphUser),
        (status = 400, description = "Invalid user")
    )
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(user): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    user.validate().map_err(ApiError::bad_request)?;
    let credential = resolve_tenant(&state, &tenant).await?;
    let created = state.graph.create_user(&credential, &user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Create several users. Every item gets its own result, so an invalid or
/// rejected item does not fail the request.
#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/users/batch",
    tag = USERS_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    request_body = [NewUser],
    responses(
        (status = 200, description = "Per-item results in request order", body = [BatchItemResult])
    )
)]
pub(crate) async fn batch_create_users(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(users): Json<Vec<NewUser>>,
) -> Result<Json<Vec<BatchItemResult>>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    let results = state.graph.batch_create_users(&credential, &users).await;
    Ok(Json(results))
}

#[utoipa::path(
    patch,
    path = "/api/o365/{tenant}/users/{user_id}",
    tag = USERS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("user_id" = String, Path, description = "User object ID or user principal name")
    ),
    request_body = UserPatch,
    responses(
        (status = 200, description = "Updated user", body = GraphUser),
        (status = 400, description = "Nothing to update")
    )
)]
pub(crate) async fn update_user(
    State(state): State<AppState>,
    Path((tenant, user_id)): Path<(String, String)>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<GraphUser>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    let credential = resolve_tenant(&state, &tenant).await?;
    let user = state.graph.update_user(&credential, &user_id, &patch).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/o365/{tenant}/users/{user_id}",
    tag = USERS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("user_id" = String, Path, description = "User object ID or user principal name")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse)
    )
)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    Path((tenant, user_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    state.graph.delete_user(&credential, &user_id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/users/{user_id}/enable",
    tag = USERS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("user_id" = String, Path, description = "User object ID or user principal name")
    ),
    responses(
        (status = 200, description = "User with sign-in enabled", body = GraphUser)
    )
)]
pub(crate) async fn enable_user(
    State(state): State<AppState>,
    Path((tenant, user_id)): Path<(String, String)>,
) -> Result<Json<GraphUser>, ApiError> {
    set_account_enabled(state, tenant, user_id, true).await
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/users/{user_id}/disable",
    tag = USERS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("user_id" = String, Path, description = "User object ID or user principal name")
    ),
    responses(
        (status = 200, description = "User with sign-in blocked", body = GraphUser)
    )
)]
pub(crate) async fn disable_user(
    State(state): State<AppState>,
    Path((tenant, user_id)): Path<(String, String)>,
) -> Result<Json<GraphUser>, ApiError> {
    set_account_enabled(state, tenant, user_id, false).await
}

async fn set_account_enabled(
    state: AppState,
    tenant: String,
    user_id: String,
    enabled: bool,
) -> Result<Json<GraphUser>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    let user = state
        .graph
        .set_account_enabled(&credential, &user_id, enabled)
        .await?;
    info!(
        "Sign-in {} for user '{}' in tenant '{}'",
        if enabled { "enabled" } else { "disabled" },
        user_id,
        tenant
    );
    Ok(Json(user))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/o365/{tenant}/users",
            get(list_users).post(create_user),
        )
        .route("/api/o365/{tenant}/users/search", get(search_users))
        .route("/api/o365/{tenant}/users/batch", post(batch_create_users))
        .route(
            "/api/o365/{tenant}/users/{user_id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/api/o365/{tenant}/users/{user_id}/enable", post(enable_user))
        .route(
            "/api/o365/{tenant}/users/{user_id}/disable",
            post(disable_user),
        )
}
