use graph_engine::models::ReportPeriod;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Default number of users returned by the list endpoint
pub const DEFAULT_USER_LIMIT: u32 = 100;

/// Largest page size Graph accepts for `/users`
pub const MAX_GRAPH_PAGE_SIZE: u32 = 999;

/// Plain confirmation of a completed operation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Configured tenant as shown to operators. Credentials are never included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TenantSummary {
    pub key: String,
    pub display_name: String,
    pub tenant_id: String,
    pub is_active: bool,
    /// Whether a token for this tenant is currently cached
    pub token_cached: bool,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Maximum number of users to return (default: 100)
    pub top: Option<u32>,
    /// OData `$filter` expression passed to Graph
    pub filter: Option<String>,
}

impl ListUsersQuery {
    pub fn limit(&self) -> u32 {
        self.top.unwrap_or(DEFAULT_USER_LIMIT)
    }

    /// Page size requested from Graph, never above what Graph accepts
    pub fn page_size(&self) -> u32 {
        self.limit().clamp(1, MAX_GRAPH_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Matched against display name and user principal name
    pub keyword: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// One of D7, D30, D90, D180 (default: D7)
    pub period: Option<String>,
}

impl ReportQuery {
    pub fn period(&self) -> Result<ReportPeriod, String> {
        match self.period.as_deref() {
            None => Ok(ReportPeriod::default()),
            Some(value) => value.parse(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDomain {
    /// Fully qualified domain name, e.g. `contoso.com`
    pub domain_name: String,
}
