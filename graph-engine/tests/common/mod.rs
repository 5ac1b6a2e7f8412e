#![allow(dead_code)]

use graph_engine::{
    DEFAULT_GRAPH_SCOPE, GraphClient, RetryPolicy, TenantCredential, TokenAcquirer, TokenCache,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TENANT_ID: &str = "contoso-id";
pub const TOKEN_PATH: &str = "/contoso-id/oauth2/v2.0/token";

/// Identity provider and Graph served by the same mock server
pub struct Harness {
    pub server: MockServer,
    pub client: GraphClient,
    pub tenant: TenantCredential,
}

impl Harness {
    pub async fn start() -> Self {
        Self::with_margin(Duration::from_secs(300)).await
    }

    pub async fn with_margin(safety_margin: Duration) -> Self {
        Self::build(safety_margin, RetryPolicy::immediate(3)).await
    }

    pub async fn with_policy(policy: RetryPolicy) -> Self {
        Self::build(Duration::from_secs(300), policy).await
    }

    async fn build(safety_margin: Duration, policy: RetryPolicy) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let server = MockServer::start().await;
        let base = Url::parse(&server.uri()).expect("mock server uri");

        let acquirer = TokenAcquirer::new(
            reqwest::Client::new(),
            base.clone(),
            DEFAULT_GRAPH_SCOPE,
            policy.clone(),
        );
        let tokens = TokenCache::new(acquirer, safety_margin, 100);
        let client = GraphClient::new(
            reqwest::Client::new(),
            base.join("v1.0").expect("graph endpoint"),
            tokens,
            policy,
        );

        Self {
            server,
            client,
            tenant: TenantCredential::new(TENANT_ID, "app-id", "app-secret"),
        }
    }

    pub fn graph_url(&self, path: &str) -> String {
        format!("{}/v1.0{}", self.server.uri(), path)
    }

    /// Token endpoint answering `token-1`, `token-2`, ... on each call
    pub async fn mount_tokens(&self, expires_in: u64) -> TokenSequence {
        let responder = TokenSequence::new(expires_in);
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(responder.clone())
            .mount(&self.server)
            .await;
        responder
    }

    /// Requests received with the given method, excluding token requests
    pub async fn graph_requests(&self, http_method: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() != TOKEN_PATH)
            .filter(|request| request.method.as_str() == http_method)
            .count()
    }
}

#[derive(Clone)]
pub struct TokenSequence {
    issued: Arc<AtomicU32>,
    expires_in: u64,
    delay: Duration,
}

impl TokenSequence {
    pub fn new(expires_in: u64) -> Self {
        Self {
            issued: Arc::new(AtomicU32::new(0)),
            expires_in,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn issued(&self) -> u32 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Respond for TokenSequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        ResponseTemplate::new(200)
            .set_delay(self.delay)
            .set_body_json(json!({
                "access_token": format!("token-{n}"),
                "expires_in": self.expires_in,
                "token_type": "Bearer"
            }))
    }
}
