use serde::Deserialize;
use std::fmt;

/// A tenant entry of the configuration file
///
/// ```toml
/// [[tenants]]
/// key = "contoso"
/// display_name = "Contoso Ltd"
/// tenant_id = "00000000-0000-0000-0000-000000000000"
/// client_id = "11111111-1111-1111-1111-111111111111"
/// client_secret = "..."
/// ```
#[derive(Deserialize, Clone, PartialEq)]
pub struct TenantRecord {
    /// Alias used in request paths
    pub key: String,

    #[serde(default)]
    pub display_name: String,

    /// Directory (tenant) ID
    pub tenant_id: String,

    /// Application (client) ID
    pub client_id: String,

    pub client_secret: String,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl fmt::Debug for TenantRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantRecord")
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .finish()
    }
}
