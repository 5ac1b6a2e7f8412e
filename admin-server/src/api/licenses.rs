use crate::api::resolve_tenant;
use crate::errors::ApiError;
use crate::openapi::LICENSES_TAG;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use graph_engine::models::{GraphUser, LicenseChange, LicenseSummary};

fn check_change(change: &LicenseChange) -> Result<(), ApiError> {
    if change.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("Field 'user_id' must not be empty"));
    }
    Ok(())
}

/// Subscriptions of the tenant with their seat usage
#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/licenses",
    tag = LICENSES_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    responses(
        (status = 200, description = "License summaries", body = [LicenseSummary])
    )
)]
pub(crate) async fn list_licenses(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<Vec<LicenseSummary>>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    Ok(Json(state.graph.license_summaries(&credential).await?))
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/licenses/assign",
    tag = LICENSES_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    request_body = LicenseChange,
    responses(
        (status = 200, description = "User after the change", body = GraphUser),
        (status = 400, description = "Invalid change or rejected by Graph")
    )
)]
pub(crate) async fn assign_licenses(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(change): Json<LicenseChange>,
) -> Result<Json<GraphUser>, ApiError> {
    check_change(&change)?;
    let credential = resolve_tenant(&state, &tenant).await?;
    Ok(Json(state.graph.assign_licenses(&credential, &change).await?))
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/licenses/remove",
    tag = LICENSES_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    request_body = LicenseChange,
    responses(
        (status = 200, description = "User after the change", body = GraphUser)
    )
)]
pub(crate) async fn remove_licenses(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(change): Json<LicenseChange>,
) -> Result<Json<GraphUser>, ApiError> {
    check_change(&change)?;
    let credential = resolve_tenant(&state, &tenant).await?;
    Ok(Json(state.graph.remove_licenses(&credential, &change).await?))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/o365/{tenant}/licenses", get(list_licenses))
        .route("/api/o365/{tenant}/licenses/assign", post(assign_licenses))
        .route("/api/o365/{tenant}/licenses/remove", post(remove_licenses))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{TestFixture, GRAPH_PREFIX};
    use http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_list_licenses_with_names_and_available_units() {
        let fixture = TestFixture::new().await;
        fixture.mount_token_endpoint("contoso-id", 3600).await;

        Mock::given(method("GET"))
            .and(path(format!("{GRAPH_PREFIX}/subscribedSkus")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "skuId": "c7df2760-2c81-4ef7-b578-5b5392b571df",
                    "skuPartNumber": "ENTERPRISEPREMIUM",
                    "consumedUnits": 18,
                    "prepaidUnits": { "enabled": 25, "suspended": 0, "warning": 0 }
                }, {
                    "skuId": "0c0f4b1e-5c5d-4b4a-9f5e-7c1e2c3d4e5f",
                    "skuPartNumber": "CONTOSO_LAB_SKU",
                    "consumedUnits": 0,
                    "prepaidUnits": { "enabled": 5 }
                }]
            })))
            .mount(&fixture.graph_mock)
            .await;

        let response = fixture.get("/api/o365/contoso/licenses").await;
        response.assert_ok();
        assert_eq!(response.json[0]["sku_part_number"], "ENTERPRISEPREMIUM");
        assert_eq!(response.json[0]["available_units"], 7);
        assert_eq!(response.json[0]["sku_name"], "Office 365 E5");
        assert_eq!(response.json[1]["sku_name"], "CONTOSO_LAB_SKU");
        assert_eq!(response.json[1]["available_units"], 5);
    }

    #[tokio::test]
    async fn test_assign_licenses_posts_graph_payload() {
        let fixture = TestFixture::new().await;
        fixture.mount_token_endpoint("contoso-id", 3600).await;

        Mock::given(method("POST"))
            .and(path(format!("{GRAPH_PREFIX}/users/u1/assignLicense")))
            .and(body_json(json!({
                "addLicenses": [{ "skuId": "sku-1", "disabledPlans": [] }],
                "removeLicenses": []
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "assignedLicenses": [{ "skuId": "sku-1", "disabledPlans": [] }]
            })))
            .expect(1)
            .mount(&fixture.graph_mock)
            .await;

        let response = fixture
            .post(
                "/api/o365/contoso/licenses/assign",
                &json!({ "user_id": "u1", "sku_ids": ["sku-1"] }),
            )
            .await;
        response.assert_ok();
        assert_eq!(response.json["assignedLicenses"][0]["skuId"], "sku-1");
    }

    #[tokio::test]
    async fn test_license_change_requires_skus() {
        let fixture = TestFixture::new().await;

        fixture
            .post(
                "/api/o365/contoso/licenses/remove",
                &json!({ "user_id": "u1", "sku_ids": [] }),
            )
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
