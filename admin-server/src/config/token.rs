use confique::Config;
use std::time::Duration;

/// Token cache configuration
#[derive(Debug, Config, Clone)]
pub struct TokenConfig {
    /// Seconds before expiry at which a cached token is refreshed (default: 300)
    #[config(env = "ADMIN_TOKEN_SAFETY_MARGIN_SECS", default = 300)]
    pub safety_margin_secs: u64,

    /// Maximum number of tenants holding a cached token (default: 10000)
    #[config(env = "ADMIN_TOKEN_MAX_TENANTS", default = 10000)]
    pub max_tenants: u64,
}

impl TokenConfig {
    pub fn safety_margin(&self) -> Duration {
        Duration::from_secs(self.safety_margin_secs)
    }
}
