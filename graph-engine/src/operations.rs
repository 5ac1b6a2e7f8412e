//! Typed Microsoft 365 administration operations built on [`GraphClient`].

use crate::client::{GraphClient, GraphRequest};
use crate::error::{GraphError, ProviderError};
use crate::models::{
    BatchItemResult, CredentialCheck, DirectoryObject, DirectoryRole, Domain,
    GraphUser, LicenseChange, LicenseSummary, NewUser, ODataPage, Organization, ReportPeriod,
    SubscribedSku, UserPatch,
};
use crate::tenant::TenantCredential;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use log::{info, warn};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;

/// Role template of the Global Administrator directory role
pub const GLOBAL_ADMIN_TEMPLATE_ID: &str = "62e90394-69f5-4237-9190-012177145e10";

fn not_found(code: &str, message: String) -> GraphError {
    GraphError::Client {
        status: 404,
        error: ProviderError::new(code, message),
    }
}

impl GraphClient {
    /// Absolute URL of a Graph resource, each segment percent-encoded
    pub fn resource(&self, segments: &[&str]) -> Result<String, GraphError> {
        let mut url = self.endpoint().clone();
        url.path_segments_mut()
            .map_err(|()| {
                GraphError::InvalidRequest(format!(
                    "Graph endpoint '{}' cannot carry a resource path",
                    self.endpoint()
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    /// Users of the tenant, fetched page by page as the stream is consumed
    pub fn list_users<'a>(
        &'a self,
        tenant: &'a TenantCredential,
        page_size: Option<u32>,
        filter: Option<&str>,
    ) -> BoxStream<'a, Result<GraphUser, GraphError>> {
        let mut request = GraphRequest::get("/users");
        if let Some(top) = page_size {
            request = request.query("$top", top.to_string());
        }
        if let Some(filter) = filter.filter(|f| !f.trim().is_empty()) {
            request = request.query("$filter", filter);
        }
        self.items(tenant, request)
    }

    /// Users whose display name or principal name matches the keyword
    pub async fn search_users(
        &self,
        tenant: &TenantCredential,
        keyword: &str,
    ) -> Result<Vec<GraphUser>, GraphError> {
        let keyword = keyword.replace('"', "");
        if keyword.trim().is_empty() {
            return Err(GraphError::InvalidRequest(
                "search keyword must not be empty".to_string(),
            ));
        }
        let request = GraphRequest::get("/users")
            .query(
                "$search",
                format!("\"displayName:{keyword}\" OR \"userPrincipalName:{keyword}\""),
            )
            .header(
                HeaderName::from_static("consistencylevel"),
                HeaderValue::from_static("eventual"),
            );
        self.items::<GraphUser>(tenant, request).try_collect().await
    }

    pub async fn get_user(
        &self,
        tenant: &TenantCredential,
        user_id: &str,
    ) -> Result<GraphUser, GraphError> {
        let request = GraphRequest::get(self.resource(&["users", user_id])?);
        self.call_json(tenant, &request).await
    }

    pub async fn create_user(
        &self,
        tenant: &TenantCredential,
        user: &NewUser,
    ) -> Result<GraphUser, GraphError> {
        user.validate().map_err(GraphError::InvalidRequest)?;
        let request = GraphRequest::post("/users", user.to_graph_payload());
        let created: GraphUser = self.call_json(tenant, &request).await?;
        info!(
            "Created user '{}' in tenant '{}'",
            user.user_principal_name, tenant.tenant_id
        );
        Ok(created)
    }

    /// Apply a partial update and return the updated user
    pub async fn update_user(
        &self,
        tenant: &TenantCredential,
        user_id: &str,
        patch: &UserPatch,
    ) -> Result<GraphUser, GraphError> {
        if patch.is_empty() {
            return Err(GraphError::InvalidRequest(
                "user update contains no fields".to_string(),
            ));
        }
        let body = serde_json::to_value(patch).map_err(|e| GraphError::InvalidRequest(e.to_string()))?;
        let request = GraphRequest::patch(self.resource(&["users", user_id])?, body);
        self.call(tenant, &request).await?;
        self.get_user(tenant, user_id).await
    }

    pub async fn delete_user(&self, tenant: &TenantCredential, user_id: &str) -> Result<(), GraphError> {
        let request = GraphRequest::delete(self.resource(&["users", user_id])?);
        self.call(tenant, &request).await?;
        info!("Deleted user '{}' in tenant '{}'", user_id, tenant.tenant_id);
        Ok(())
    }

    /// Enable or block sign-in for a user
    pub async fn set_account_enabled(
        &self,
        tenant: &TenantCredential,
        user_id: &str,
        enabled: bool,
    ) -> Result<GraphUser, GraphError> {
        self.update_user(tenant, user_id, &UserPatch::account_enabled(enabled))
            .await
    }

    /// Create users one by one with bounded concurrency.
    ///
    /// Results come back in input order, one per item. An item that is
    /// invalid or rejected by Graph is reported in its result and never
    /// stops the others.
    pub async fn batch_create_users(
        &self,
        tenant: &TenantCredential,
        users: &[NewUser],
    ) -> Vec<BatchItemResult> {
        let items: Vec<BoxFuture<'_, BatchItemResult>> = users
            .iter()
            .enumerate()
            .map(|(index, user)| self.create_batch_item(tenant, index, user).boxed())
            .collect();
        let results: Vec<BatchItemResult> = stream::iter(items)
            .buffered(self.batch_concurrency())
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            "Batch create for tenant '{}': {} succeeded, {} failed",
            tenant.tenant_id,
            results.len() - failed,
            failed
        );
        results
    }

    async fn create_batch_item(
        &self,
        tenant: &TenantCredential,
        index: usize,
        user: &NewUser,
    ) -> BatchItemResult {
        match self.create_user(tenant, user).await {
            Ok(created) => BatchItemResult::succeeded(index, &user.user_principal_name, created),
            Err(err) => {
                warn!(
                    "Batch item {} ('{}') failed for tenant '{}': {}",
                    index, user.user_principal_name, tenant.tenant_id, err
                );
                BatchItemResult::failed(index, &user.user_principal_name, err)
            }
        }
    }

    pub async fn subscribed_skus(
        &self,
        tenant: &TenantCredential,
    ) -> Result<Vec<SubscribedSku>, GraphError> {
        self.items::<SubscribedSku>(tenant, GraphRequest::get("/subscribedSkus"))
            .try_collect()
            .await
    }

    /// Seat usage per subscription
    pub async fn license_summaries(
        &self,
        tenant: &TenantCredential,
    ) -> Result<Vec<LicenseSummary>, GraphError> {
        let skus = self.subscribed_skus(tenant).await?;
        Ok(skus.iter().map(LicenseSummary::from).collect())
    }

    pub async fn assign_licenses(
        &self,
        tenant: &TenantCredential,
        change: &LicenseChange,
    ) -> Result<GraphUser, GraphError> {
        self.change_licenses(tenant, change, change.assign_payload())
            .await
    }

    pub async fn remove_licenses(
        &self,
        tenant: &TenantCredential,
        change: &LicenseChange,
    ) -> Result<GraphUser, GraphError> {
        self.change_licenses(tenant, change, change.remove_payload())
            .await
    }

    async fn change_licenses(
        &self,
        tenant: &TenantCredential,
        change: &LicenseChange,
        body: serde_json::Value,
    ) -> Result<GraphUser, GraphError> {
        if change.sku_ids.is_empty() {
            return Err(GraphError::InvalidRequest(
                "at least one SKU id is required".to_string(),
            ));
        }
        let request = GraphRequest::post(
            self.resource(&["users", &change.user_id, "assignLicense"])?,
            body,
        );
        self.call_json(tenant, &request).await
    }

    pub async fn list_domains(&self, tenant: &TenantCredential) -> Result<Vec<Domain>, GraphError> {
        self.items::<Domain>(tenant, GraphRequest::get("/domains"))
            .try_collect()
            .await
    }

    pub async fn get_domain(
        &self,
        tenant: &TenantCredential,
        domain_id: &str,
    ) -> Result<Domain, GraphError> {
        let request = GraphRequest::get(self.resource(&["domains", domain_id])?);
        self.call_json(tenant, &request).await
    }

    pub async fn create_domain(
        &self,
        tenant: &TenantCredential,
        domain_name: &str,
    ) -> Result<Domain, GraphError> {
        let request = GraphRequest::post("/domains", json!({ "id": domain_name }));
        let domain: Domain = self.call_json(tenant, &request).await?;
        info!("Added domain '{}' to tenant '{}'", domain.id, tenant.tenant_id);
        Ok(domain)
    }

    pub async fn verify_domain(
        &self,
        tenant: &TenantCredential,
        domain_id: &str,
    ) -> Result<Domain, GraphError> {
        let request = GraphRequest::post(
            self.resource(&["domains", domain_id, "verify"])?,
            json!({}),
        );
        self.call_json(tenant, &request).await
    }

    /// Start domain removal. Graph completes it asynchronously.
    pub async fn delete_domain(
        &self,
        tenant: &TenantCredential,
        domain_id: &str,
    ) -> Result<(), GraphError> {
        let request = GraphRequest::delete(self.resource(&["domains", domain_id])?);
        self.call(tenant, &request).await?;
        info!(
            "Requested deletion of domain '{}' in tenant '{}'",
            domain_id, tenant.tenant_id
        );
        Ok(())
    }

    /// Activated directory roles
    pub async fn list_directory_roles(
        &self,
        tenant: &TenantCredential,
    ) -> Result<Vec<DirectoryRole>, GraphError> {
        self.items::<DirectoryRole>(tenant, GraphRequest::get("/directoryRoles"))
            .try_collect()
            .await
    }

    pub async fn list_role_members(
        &self,
        tenant: &TenantCredential,
        role_id: &str,
    ) -> Result<Vec<DirectoryObject>, GraphError> {
        let request = GraphRequest::get(self.resource(&["directoryRoles", role_id, "members"])?);
        self.items::<DirectoryObject>(tenant, request)
            .try_collect()
            .await
    }

    pub async fn add_role_member(
        &self,
        tenant: &TenantCredential,
        role_id: &str,
        user_id: &str,
    ) -> Result<(), GraphError> {
        let reference = self.resource(&["directoryObjects", user_id])?;
        let request = GraphRequest::post(
            self.resource(&["directoryRoles", role_id, "members", "$ref"])?,
            json!({ "@odata.id": reference }),
        );
        self.call(tenant, &request).await?;
        info!(
            "Added '{}' to role '{}' in tenant '{}'",
            user_id, role_id, tenant.tenant_id
        );
        Ok(())
    }

    pub async fn remove_role_member(
        &self,
        tenant: &TenantCredential,
        role_id: &str,
        user_id: &str,
    ) -> Result<(), GraphError> {
        let request = GraphRequest::delete(self.resource(&[
            "directoryRoles",
            role_id,
            "members",
            user_id,
            "$ref",
        ])?);
        self.call(tenant, &request).await?;
        info!(
            "Removed '{}' from role '{}' in tenant '{}'",
            user_id, role_id, tenant.tenant_id
        );
        Ok(())
    }

    /// Activated role instantiated from the given role template
    pub async fn find_role_by_template(
        &self,
        tenant: &TenantCredential,
        template_id: &str,
    ) -> Result<DirectoryRole, GraphError> {
        self.list_directory_roles(tenant)
            .await?
            .into_iter()
            .find(|role| role.role_template_id.as_deref() == Some(template_id))
            .ok_or_else(|| {
                not_found(
                    "Request_ResourceNotFound",
                    format!("No activated directory role for template '{template_id}'"),
                )
            })
    }

    pub async fn promote_global_admin(
        &self,
        tenant: &TenantCredential,
        user_id: &str,
    ) -> Result<(), GraphError> {
        let role = self
            .find_role_by_template(tenant, GLOBAL_ADMIN_TEMPLATE_ID)
            .await?;
        self.add_role_member(tenant, &role.id, user_id).await
    }

    pub async fn demote_global_admin(
        &self,
        tenant: &TenantCredential,
        user_id: &str,
    ) -> Result<(), GraphError> {
        let role = self
            .find_role_by_template(tenant, GLOBAL_ADMIN_TEMPLATE_ID)
            .await?;
        self.remove_role_member(tenant, &role.id, user_id).await
    }

    pub async fn organization(&self, tenant: &TenantCredential) -> Result<Organization, GraphError> {
        let page: ODataPage<Organization> = self
            .call_json(tenant, &GraphRequest::get("/organization"))
            .await?;
        page.value.into_iter().next().ok_or_else(|| {
            not_found(
                "Request_ResourceNotFound",
                format!("No organization returned for tenant '{}'", tenant.tenant_id),
            )
        })
    }

    /// OneDrive usage per account as CSV
    pub async fn onedrive_usage_report(
        &self,
        tenant: &TenantCredential,
        period: ReportPeriod,
    ) -> Result<String, GraphError> {
        let request = GraphRequest::get(format!(
            "/reports/getOneDriveUsageAccountDetail(period='{period}')"
        ));
        self.call_text(tenant, &request).await
    }

    /// Mailbox usage per user as CSV
    pub async fn mailbox_usage_report(
        &self,
        tenant: &TenantCredential,
        period: ReportPeriod,
    ) -> Result<String, GraphError> {
        let request = GraphRequest::get(format!(
            "/reports/getMailboxUsageDetail(period='{period}')"
        ));
        self.call_text(tenant, &request).await
    }

    /// Check the tenant's credentials with a fresh token exchange
    pub async fn validate_credentials(&self, tenant: &TenantCredential) -> CredentialCheck {
        self.tokens().evict(&tenant.tenant_id).await;
        match self.tokens().get_token(tenant).await {
            Ok(_) => CredentialCheck {
                valid: true,
                error: None,
            },
            Err(err) => {
                warn!(
                    "Credential validation failed for tenant '{}': {}",
                    tenant.tenant_id, err
                );
                CredentialCheck {
                    valid: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
