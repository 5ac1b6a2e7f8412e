use crate::api::resolve_tenant;
use crate::errors::ApiError;
use crate::models::ReportQuery;
use crate::openapi::REPORTS_TAG;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use graph_engine::models::{Organization, ReportPeriod};

fn csv_attachment(name: &str, period: ReportPeriod, csv: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={name}_{period}.csv"),
            ),
        ],
        csv,
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/reports/organization",
    tag = REPORTS_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    responses(
        (status = 200, description = "Organization profile", body = Organization)
    )
)]
pub(crate) async fn organization(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<Organization>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    Ok(Json(state.graph.organization(&credential).await?))
}

#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/reports/onedrive",
    tag = REPORTS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ReportQuery
    ),
    responses(
        (status = 200, description = "OneDrive usage per account", content_type = "text/csv", body = String),
        (status = 400, description = "Unknown period")
    )
)]
pub(crate) async fn onedrive_usage(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let period = query.period().map_err(ApiError::bad_request)?;
    let credential = resolve_tenant(&state, &tenant).await?;
    let csv = state
        .graph
        .onedrive_usage_report(&credential, period)
        .await?;
    Ok(csv_attachment("onedrive_usage", period, csv))
}

#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/reports/exchange",
    tag = REPORTS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ReportQuery
    ),
    responses(
        (status = 200, description = "Mailbox usage per user", content_type = "text/csv", body = String),
        (status = 400, description = "Unknown period")
    )
)]
pub(crate) async fn exchange_usage(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let period = query.period().map_err(ApiError::bad_request)?;
    let credential = resolve_tenant(&state, &tenant).await?;
    let csv = state.graph.mailbox_usage_report(&credential, period).await?;
    Ok(csv_attachment("exchange_usage", period, csv))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/o365/{tenant}/reports/organization", get(organization))
        .route("/api/o365/{tenant}/reports/onedrive", get(onedrive_usage))
        .route("/api/o365/{tenant}/reports/exchange", get(exchange_usage))
}
