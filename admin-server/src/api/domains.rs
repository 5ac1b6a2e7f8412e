use crate::api::resolve_tenant;
use crate::errors::ApiError;
use crate::models::{CreateDomain, MessageResponse};
use crate::openapi::DOMAINS_TAG;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use graph_engine::models::Domain;

#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/domains",
    tag = DOMAINS_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    responses(
        (status = 200, description = "Domains of the tenant", body = [Domain])
    )
)]
pub(crate) async fn list_domains(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<Vec<Domain>>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    Ok(Json(state.graph.list_domains(&credential).await?))
}

#[utoipa::path(
    get,
    path = "/api/o365/{tenant}/domains/{domain_id}",
    tag = DOMAINS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("domain_id" = String, Path, description = "Domain name")
    ),
    responses(
        (status = 200, description = "The domain", body = Domain),
        (status = 404, description = "Domain not found")
    )
)]
pub(crate) async fn get_domain(
    State(state): State<AppState>,
    Path((tenant, domain_id)): Path<(String, String)>,
) -> Result<Json<Domain>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    Ok(Json(state.graph.get_domain(&credential, &domain_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/domains",
    tag = DOMAINS_TAG,
    security(("api_key" = [])),
    params(("tenant" = String, Path, description = "Tenant key, directory ID or `default`")),
    request_body = CreateDomain,
    responses(
        (status = 201, description = "Domain added, pending verification", body = Domain),
        (status = 400, description = "Invalid domain name")
    )
)]
pub(crate) async fn create_domain(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(request): Json<CreateDomain>,
) -> Result<impl IntoResponse, ApiError> {
    let domain_name = request.domain_name.trim();
    if domain_name.is_empty() || !domain_name.contains('.') {
        return Err(ApiError::bad_request(format!(
            "'{domain_name}' is not a valid domain name"
        )));
    }
    let credential = resolve_tenant(&state, &tenant).await?;
    let domain = state.graph.create_domain(&credential, domain_name).await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

/// Ask Graph to check the domain's DNS verification records
#[utoipa::path(
    post,
    path = "/api/o365/{tenant}/domains/{domain_id}/verify",
    tag = DOMAINS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("domain_id" = String, Path, description = "Domain name")
    ),
    responses(
        (status = 200, description = "Domain after verification", body = Domain),
        (status = 400, description = "Verification records not found")
    )
)]
pub(crate) async fn verify_domain(
    State(state): State<AppState>,
    Path((tenant, domain_id)): Path<(String, String)>,
) -> Result<Json<Domain>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    Ok(Json(state.graph.verify_domain(&credential, &domain_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/o365/{tenant}/domains/{domain_id}",
    tag = DOMAINS_TAG,
    security(("api_key" = [])),
    params(
        ("tenant" = String, Path, description = "Tenant key, directory ID or `default`"),
        ("domain_id" = String, Path, description = "Domain name")
    ),
    responses(
        (status = 200, description = "Deletion requested", body = MessageResponse)
    )
)]
pub(crate) async fn delete_domain(
    State(state): State<AppState>,
    Path((tenant, domain_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let credential = resolve_tenant(&state, &tenant).await?;
    state.graph.delete_domain(&credential, &domain_id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Domain {domain_id} deletion initiated"
    ))))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/o365/{tenant}/domains",
            get(list_domains).post(create_domain),
        )
        .route(
            "/api/o365/{tenant}/domains/{domain_id}",
            get(get_domain).delete(delete_domain),
        )
        .route(
            "/api/o365/{tenant}/domains/{domain_id}/verify",
            post(verify_domain),
        )
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{TestFixture, GRAPH_PREFIX};
    use http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_create_and_verify_domain() {
        let fixture = TestFixture::new().await;
        fixture.mount_token_endpoint("contoso-id", 3600).await;

        Mock::given(method("POST"))
            .and(path(format!("{GRAPH_PREFIX}/domains")))
            .and(body_json(json!({ "id": "contoso.com" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "contoso.com",
                "authenticationType": "Managed",
                "isVerified": false
            })))
            .expect(1)
            .mount(&fixture.graph_mock)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{GRAPH_PREFIX}/domains/contoso.com/verify")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "contoso.com",
                "isVerified": true
            })))
            .expect(1)
            .mount(&fixture.graph_mock)
            .await;

        let response = fixture
            .post(
                "/api/o365/contoso/domains",
                &json!({ "domain_name": "contoso.com" }),
            )
            .await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json["isVerified"], false);

        let response = fixture
            .post("/api/o365/contoso/domains/contoso.com/verify", &json!({}))
            .await;
        response.assert_ok();
        assert_eq!(response.json["isVerified"], true);
    }

    #[tokio::test]
    async fn test_invalid_domain_name_is_rejected() {
        let fixture = TestFixture::new().await;

        fixture
            .post("/api/o365/contoso/domains", &json!({ "domain_name": "localhost" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_domain() {
        let fixture = TestFixture::new().await;
        fixture.mount_token_endpoint("contoso-id", 3600).await;

        Mock::given(method("DELETE"))
            .and(path(format!("{GRAPH_PREFIX}/domains/old.contoso.com")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&fixture.graph_mock)
            .await;

        let response = fixture.delete("/api/o365/contoso/domains/old.contoso.com").await;
        response.assert_ok();
        assert_eq!(
            response.json["message"],
            "Domain old.contoso.com deletion initiated"
        );
    }
}
