use crate::config::Settings;
use crate::tenants::{RegistryError, StaticTenantRegistry};
use graph_engine::{GraphClient, TokenAcquirer, TokenCache};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid {name} URL '{value}': {source}")]
    Url {
        name: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub tenants: Arc<StaticTenantRegistry>,
    pub graph: Arc<GraphClient>,
}

impl AppState {
    /// Shared client for the token endpoint and Graph
    fn create_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
        Client::builder()
            .user_agent(concat!("admin-server/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            // Keep up to 10 idle connections per host for 90 seconds
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
    }

    fn parse_url(name: &'static str, value: &str) -> Result<Url, StateError> {
        Url::parse(value).map_err(|source| StateError::Url {
            name,
            value: value.to_string(),
            source,
        })
    }

    /// Build the state. Tenant records move out of the settings into the
    /// registry so the secrets are only held as `SecretString`.
    pub fn new(mut settings: Settings) -> Result<Self, StateError> {
        let records = std::mem::take(&mut settings.tenants);
        let tenants = StaticTenantRegistry::from_records(records)?;

        let http = Self::create_http_client(settings.graph.request_timeout())?;
        let policy = settings.graph.retry_policy();

        let authority = Self::parse_url("authority", &settings.graph.authority)?;
        let endpoint = Self::parse_url("graph endpoint", &settings.graph.endpoint)?;

        let acquirer = TokenAcquirer::new(
            http.clone(),
            authority,
            settings.graph.scope.clone(),
            policy.clone(),
        );
        let tokens = TokenCache::new(
            acquirer,
            settings.token.safety_margin(),
            settings.token.max_tenants,
        );
        let graph = GraphClient::new(http, endpoint, tokens, policy)
            .with_batch_concurrency(settings.graph.batch_concurrency);

        Ok(Self {
            settings: Arc::new(settings),
            tenants: Arc::new(tenants),
            graph: Arc::new(graph),
        })
    }

    #[cfg(test)]
    pub fn for_testing(settings: &Settings) -> Self {
        let settings = Settings {
            port: settings.port,
            api_key: settings.api_key.clone(),
            graph: settings.graph.clone(),
            token: settings.token.clone(),
            tenants: settings.tenants.clone(),
        };
        Self::new(settings).expect("Failed to create test state")
    }
}
