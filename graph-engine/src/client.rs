use crate::error::{GraphError, ProviderError};
use crate::models::ODataPage;
use crate::retry::RetryPolicy;
use crate::tenant::TenantCredential;
use crate::token_cache::TokenCache;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Default Graph endpoint, requests are relative to it
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// A single logical Graph operation
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub method: Method,
    /// Path relative to the Graph endpoint, or an absolute URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl GraphRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Request for a continuation link. The link already carries the query.
    fn follow(&self, link: String) -> Self {
        Self {
            method: Method::GET,
            path: link,
            query: Vec::new(),
            body: None,
            headers: self.headers.clone(),
        }
    }
}

/// Graph client shared by every tenant.
///
/// Each call resolves a bearer token from the [`TokenCache`] before every
/// attempt. A 401 evicts the rejected token and retries once; 429, 5xx and
/// transport failures are retried within the attempt budget of the
/// [`RetryPolicy`]. Other 4xx responses fail immediately.
#[derive(Clone)]
pub struct GraphClient {
    http: Client,
    endpoint: Url,
    tokens: TokenCache,
    policy: RetryPolicy,
    batch_concurrency: usize,
}

impl GraphClient {
    pub fn new(http: Client, endpoint: Url, tokens: TokenCache, policy: RetryPolicy) -> Self {
        Self {
            http,
            endpoint,
            tokens,
            policy,
            batch_concurrency: 4,
        }
    }

    /// Number of batch items submitted concurrently
    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency.max(1);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub(crate) fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
    }

    /// Absolute URL of a request, continuation links are used verbatim
    pub fn resolve_url(&self, request: &GraphRequest) -> Result<Url, GraphError> {
        let mut url = if request.path.starts_with("https://") || request.path.starts_with("http://")
        {
            Url::parse(&request.path)?
        } else {
            let base = self.endpoint.as_str().trim_end_matches('/');
            let path = request.path.trim_start_matches('/');
            Url::parse(&format!("{base}/{path}"))?
        };

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Run a request and decode the JSON body. Empty bodies yield `Value::Null`.
    pub async fn call(
        &self,
        tenant: &TenantCredential,
        request: &GraphRequest,
    ) -> Result<Value, GraphError> {
        let body = self.execute(tenant, request).await?.bytes().await.map_err(|e| {
            GraphError::Decode(format!("failed to read response body: {e}"))
        })?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| GraphError::Decode(e.to_string()))
    }

    /// Run a request and deserialize the JSON body into `T`
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        tenant: &TenantCredential,
        request: &GraphRequest,
    ) -> Result<T, GraphError> {
        let value = self.call(tenant, request).await?;
        serde_json::from_value(value).map_err(|e| GraphError::Decode(e.to_string()))
    }

    /// Run a request whose answer is not JSON, e.g. CSV reports
    pub async fn call_text(
        &self,
        tenant: &TenantCredential,
        request: &GraphRequest,
    ) -> Result<String, GraphError> {
        self.execute(tenant, request)
            .await?
            .text()
            .await
            .map_err(|e| GraphError::Decode(format!("failed to read response body: {e}")))
    }

    /// Pages of a collection, following `@odata.nextLink` only when the
    /// consumer asks for the next page.
    pub fn pages<'a, T>(
        &'a self,
        tenant: &'a TenantCredential,
        request: GraphRequest,
    ) -> BoxStream<'a, Result<Vec<T>, GraphError>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        stream::try_unfold(Some(request), move |next| async move {
            let Some(request) = next else {
                return Ok::<_, GraphError>(None);
            };
            let page: ODataPage<T> = self.call_json(tenant, &request).await?;
            debug!(
                "Fetched page of {} items for tenant '{}'",
                page.value.len(),
                tenant.tenant_id
            );
            let following = page.next_link.map(|link| request.follow(link));
            Ok(Some((page.value, following)))
        })
        .boxed()
    }

    /// Items of a collection across all pages
    pub fn items<'a, T>(
        &'a self,
        tenant: &'a TenantCredential,
        request: GraphRequest,
    ) -> BoxStream<'a, Result<T, GraphError>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        self.pages(tenant, request)
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<T, GraphError>)))
            .try_flatten()
            .boxed()
    }

    async fn execute(
        &self,
        tenant: &TenantCredential,
        request: &GraphRequest,
    ) -> Result<Response, GraphError> {
        let url = self.resolve_url(request)?;
        let tenant_id = tenant.tenant_id.as_str();
        let mut attempt = 1;
        let mut refreshed = false;

        loop {
            let token = self.tokens.get_token(tenant).await?;
            debug!(
                "{} {} for tenant '{}' (attempt {}/{})",
                request.method, url, tenant_id, attempt, self.policy.max_attempts
            );

            let mut builder = self
                .http
                .request(request.method.clone(), url.clone())
                .bearer_auth(&token.bearer_value)
                .headers(request.headers.clone());
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let (status, delay, message) = match builder.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                    let error = read_provider_error(response).await;
                    if refreshed {
                        return Err(GraphError::Unauthorized(error));
                    }
                    warn!(
                        "Graph rejected the token of tenant '{}' ({}), refreshing",
                        tenant_id, error.code
                    );
                    self.tokens
                        .evict_if_current(tenant_id, &token.bearer_value)
                        .await;
                    refreshed = true;
                    continue;
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let delay = self.policy.retry_after(response.headers());
                    let error = read_provider_error(response).await;
                    (Some(429), delay, format!("throttled: {}", error.message))
                }
                Ok(response) if response.status().is_server_error() => {
                    let status = response.status().as_u16();
                    let error = read_provider_error(response).await;
                    (
                        Some(status),
                        self.policy.jittered_backoff(attempt),
                        format!("{}: {}", error.code, error.message),
                    )
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let error = read_provider_error(response).await;
                    debug!(
                        "Graph returned {} for tenant '{}': {}",
                        status, tenant_id, error.code
                    );
                    return Err(GraphError::Client { status, error });
                }
                Err(err) => (None, self.policy.jittered_backoff(attempt), err.to_string()),
            };

            if !self.policy.should_retry(attempt) {
                warn!(
                    "Giving up on {} {} for tenant '{}' after {} attempts: {}",
                    request.method, url, tenant_id, attempt, message
                );
                return Err(GraphError::Transient {
                    status,
                    attempts: attempt,
                    message,
                });
            }

            warn!(
                "Transient Graph failure for tenant '{}' ({}), retrying in {:?}",
                tenant_id, message, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

async fn read_provider_error(response: Response) -> ProviderError {
    let status = response.status().as_u16();
    match response.bytes().await {
        Ok(body) => ProviderError::from_graph_body(status, &body),
        Err(e) => ProviderError::new(format!("HTTP{status}"), e.to_string()),
    }
}
