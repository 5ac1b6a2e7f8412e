use crate::api::{domains, health, licenses, reports, roles, tenants, users};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const TENANTS_TAG: &str = "Tenants API";
pub(crate) const USERS_TAG: &str = "Users API";
pub(crate) const LICENSES_TAG: &str = "Licenses API";
pub(crate) const DOMAINS_TAG: &str = "Domains API";
pub(crate) const ROLES_TAG: &str = "Roles API";
pub(crate) const REPORTS_TAG: &str = "Reports API";

/// Operators authenticate with `Authorization: Bearer <api_key>`
struct ApiKeyAddon;

impl Modify for ApiKeyAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme(
                "api_key",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        tenants::list_tenants,
        tenants::validate_tenant,
        users::list_users,
        users::search_users,
        users::get_user,
        users::create_user,
        users::batch_create_users,
        users::update_user,
        users::delete_user,
        users::enable_user,
        users::disable_user,
        licenses::list_licenses,
        licenses::assign_licenses,
        licenses::remove_licenses,
        domains::list_domains,
        domains::get_domain,
        domains::create_domain,
        domains::verify_domain,
        domains::delete_domain,
        roles::list_roles,
        roles::list_role_members,
        roles::assign_role,
        roles::revoke_role,
        roles::promote_global_admin,
        roles::demote_global_admin,
        reports::organization,
        reports::onedrive_usage,
        reports::exchange_usage,
    ),
    modifiers(&ApiKeyAddon),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = TENANTS_TAG, description = "Configured tenants and credential checks"),
        (name = USERS_TAG, description = "User management"),
        (name = LICENSES_TAG, description = "Subscriptions and license assignment"),
        (name = DOMAINS_TAG, description = "Domain management"),
        (name = ROLES_TAG, description = "Directory roles"),
        (name = REPORTS_TAG, description = "Organization profile and usage reports"),
    ),
    info(
        title = "Microsoft 365 Admin Gateway API",
        description = "Multi-tenant Microsoft 365 administration over Microsoft Graph",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;
