pub(crate) use crate::config::graph::GraphConfig;
pub(crate) use crate::config::tenant::TenantRecord;
pub(crate) use crate::config::token::TokenConfig;
use confique::Config;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use url::Url;

pub mod graph;
pub mod tenant;
pub mod token;

/// Path of the configuration file unless `ADMIN_CONFIG_FILE` says otherwise
pub const DEFAULT_CONFIG_FILE: &str = "admin.toml";

/// Tenant alias resolving to the first active tenant
pub const DEFAULT_TENANT_ALIAS: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure for the admin server
#[derive(Debug, Config)]
pub struct Settings {
    /// The port the server will listen to (default: 8000)
    #[config(env = "ADMIN_PORT", default = 8000)]
    pub port: u16,

    /// API key operators present as a bearer token - mandatory for all API calls
    #[config(env = "ADMIN_API_KEY")]
    pub api_key: String,

    /// Graph and identity provider configuration
    #[config(nested)]
    pub graph: GraphConfig,

    /// Token cache configuration
    #[config(nested)]
    pub token: TokenConfig,

    /// Managed tenants, only read from the configuration file
    #[config(default = [])]
    pub tenants: Vec<TenantRecord>,
}

impl Settings {
    /// Load from `ADMIN_*` environment variables layered over the
    /// configuration file
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var("ADMIN_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = Settings::builder()
            .env()
            .file(path.as_ref())
            .load()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from the configuration file only
    #[cfg(test)]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = Settings::builder()
            .file(path.as_ref())
            .load()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("api_key must not be empty".to_string()));
        }

        for (name, value) in [
            ("graph.endpoint", &self.graph.endpoint),
            ("graph.authority", &self.graph.authority),
        ] {
            Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{name} '{value}' is not a URL: {e}")))?;
        }

        if self.graph.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "graph.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.graph.batch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "graph.batch_concurrency must be at least 1".to_string(),
            ));
        }

        let mut keys = HashSet::new();
        for tenant in &self.tenants {
            if tenant.key == DEFAULT_TENANT_ALIAS {
                return Err(ConfigError::Invalid(format!(
                    "tenant key '{DEFAULT_TENANT_ALIAS}' is reserved"
                )));
            }
            if tenant.key.trim().is_empty()
                || tenant.tenant_id.trim().is_empty()
                || tenant.client_id.trim().is_empty()
                || tenant.client_secret.is_empty()
            {
                return Err(ConfigError::Invalid(format!(
                    "tenant '{}' requires key, tenant_id, client_id and client_secret",
                    tenant.key
                )));
            }
            if !keys.insert(tenant.key.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate tenant key '{}'",
                    tenant.key
                )));
            }
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn for_test_with_mocks(
        login_mock: &wiremock::MockServer,
        graph_mock: &wiremock::MockServer,
    ) -> Self {
        Self {
            port: 0,
            api_key: "test_api_key".to_string(),
            graph: GraphConfig {
                endpoint: format!("{}/v1.0", graph_mock.uri()),
                scope: graph_engine::DEFAULT_GRAPH_SCOPE.to_string(),
                authority: login_mock.uri(),
                request_timeout_secs: 5,
                max_attempts: 3,
                base_backoff_ms: 10,
                backoff_factor: 2,
                max_backoff_secs: 1,
                default_retry_after_secs: 0,
                max_retry_after_secs: 1,
                batch_concurrency: 2,
            },
            token: TokenConfig {
                safety_margin_secs: 300,
                max_tenants: 100,
            },
            tenants: vec![
                TenantRecord {
                    key: "contoso".to_string(),
                    display_name: "Contoso Ltd".to_string(),
                    tenant_id: "contoso-id".to_string(),
                    client_id: "contoso-app".to_string(),
                    client_secret: "contoso-secret".to_string(),
                    is_active: true,
                },
                TenantRecord {
                    key: "fabrikam".to_string(),
                    display_name: "Fabrikam Inc".to_string(),
                    tenant_id: "fabrikam-id".to_string(),
                    client_id: "fabrikam-app".to_string(),
                    client_secret: "fabrikam-secret".to_string(),
                    is_active: false,
                },
            ],
        }
    }
}
