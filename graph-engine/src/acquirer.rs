//! OAuth2 client-credentials exchange against the identity provider.

use crate::error::TokenError;
use crate::retry::RetryPolicy;
use crate::tenant::TenantCredential;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Default identity provider authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Default application scope requested for Graph
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Successful token response from the identity provider
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredToken {
    pub access_token: String,
    pub expires_in: Duration,
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: ExpiresIn,
    #[serde(default)]
    token_type: String,
}

/// Some authorities send `expires_in` as a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Seconds(u64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Performs the client-credentials grant for one tenant at a time.
///
/// Network failures, timeouts and 5xx responses are retried according to the
/// retry policy. Any 4xx response is final.
#[derive(Debug, Clone)]
pub struct TokenAcquirer {
    http: Client,
    authority: Url,
    scope: String,
    policy: RetryPolicy,
}

impl TokenAcquirer {
    pub fn new(http: Client, authority: Url, scope: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            http,
            authority,
            scope: scope.into(),
            policy,
        }
    }

    /// Scope requested on every exchange
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Token endpoint of the given tenant
    pub fn token_url(&self, tenant_id: &str) -> Result<Url, TokenError> {
        let authority = self.authority.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{authority}/{tenant_id}/oauth2/v2.0/token"
        ))?)
    }

    /// Exchange the tenant's application credentials for a bearer token
    pub async fn acquire(&self, credential: &TenantCredential) -> Result<AcquiredToken, TokenError> {
        let tenant_id = credential.tenant_id.as_str();
        let url = self.token_url(tenant_id)?;
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.secret()),
            ("scope", self.scope.as_str()),
        ];

        let mut attempt = 1;
        loop {
            debug!(
                "Requesting token for tenant '{}' (attempt {}/{})",
                tenant_id, attempt, self.policy.max_attempts
            );

            let (status, reason) = match self.http.post(url.clone()).form(&params).send().await {
                Ok(response) if response.status().is_success() => {
                    return self.parse_token(tenant_id, response).await;
                }
                Ok(response) if response.status().is_client_error() => {
                    return Err(self.parse_rejection(tenant_id, response).await);
                }
                Ok(response) => {
                    let status = response.status();
                    (Some(status.as_u16()), format!("HTTP {status}"))
                }
                Err(err) => (None, err.to_string()),
            };

            if !self.policy.should_retry(attempt) {
                return Err(TokenError::Unavailable {
                    tenant_id: tenant_id.to_string(),
                    status,
                    attempts: attempt,
                    reason,
                });
            }

            let delay = self.policy.jittered_backoff(attempt);
            warn!(
                "Token request for tenant '{}' failed ({}), retrying in {:?}",
                tenant_id, reason, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn parse_token(
        &self,
        tenant_id: &str,
        response: reqwest::Response,
    ) -> Result<AcquiredToken, TokenError> {
        let invalid = |reason: String| TokenError::InvalidResponse {
            tenant_id: tenant_id.to_string(),
            reason,
        };

        let body = response.bytes().await.map_err(|e| invalid(e.to_string()))?;
        let token: TokenResponse =
            serde_json::from_slice(&body).map_err(|e| invalid(e.to_string()))?;

        let expires_in = match token.expires_in {
            ExpiresIn::Seconds(seconds) => seconds,
            ExpiresIn::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| invalid(format!("expires_in is not a number: {text}")))?,
        };

        if token.access_token.is_empty() {
            return Err(invalid("empty access_token".to_string()));
        }

        debug!(
            "Acquired token for tenant '{}', expires in {}s",
            tenant_id, expires_in
        );

        Ok(AcquiredToken {
            access_token: token.access_token,
            expires_in: Duration::from_secs(expires_in),
            token_type: token.token_type,
        })
    }

    async fn parse_rejection(&self, tenant_id: &str, response: reqwest::Response) -> TokenError {
        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();
        let detail: TokenErrorResponse = serde_json::from_slice(&body).unwrap_or_default();

        warn!(
            "Token request for tenant '{}' rejected with {}: {}",
            tenant_id, status, detail.error
        );

        TokenError::Rejected {
            tenant_id: tenant_id.to_string(),
            status: status.as_u16(),
            code: if detail.error.is_empty() {
                format!("HTTP{}", status.as_u16())
            } else {
                detail.error
            },
            description: detail.error_description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn acquirer(server: &MockServer) -> TokenAcquirer {
        TokenAcquirer::new(
            Client::new(),
            Url::parse(&server.uri()).expect("mock server uri"),
            DEFAULT_GRAPH_SCOPE,
            RetryPolicy::immediate(3),
        )
    }

    fn credential() -> TenantCredential {
        TenantCredential::new("contoso-id", "app-id", "app-secret")
    }

    #[test]
    fn test_token_url() {
        let acquirer = TokenAcquirer::new(
            Client::new(),
            Url::parse("https://login.microsoftonline.com/").unwrap(),
            DEFAULT_GRAPH_SCOPE,
            RetryPolicy::default(),
        );
        assert_eq!(
            acquirer.token_url("contoso-id").unwrap().as_str(),
            "https://login.microsoftonline.com/contoso-id/oauth2/v2.0/token"
        );
    }

    #[tokio::test]
    async fn test_acquire_sends_client_credentials_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contoso-id/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=app-id"))
            .and(body_string_contains("client_secret=app-secret"))
            .and(body_string_contains("scope=https%3A%2F%2Fgraph.microsoft.com%2F.default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-1",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = acquirer(&server).acquire(&credential()).await.unwrap();
        assert_eq!(token.access_token, "token-1");
        assert_eq!(token.expires_in, Duration::from_secs(3599));
        assert_eq!(token.token_type, "Bearer");
    }

    #[tokio::test]
    async fn test_acquire_accepts_string_lifetime() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-1",
                "expires_in": "3600",
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let token = acquirer(&server).acquire(&credential()).await.unwrap();
        assert_eq!(token.expires_in, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = acquirer(&server).acquire(&credential()).await.unwrap_err();
        match err {
            TokenError::Rejected {
                status,
                code,
                description,
                ..
            } => {
                assert_eq!(status, 401);
                assert_eq!(code, "invalid_client");
                assert!(description.starts_with("AADSTS7000215"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_attempt_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = acquirer(&server).acquire(&credential()).await.unwrap_err();
        assert!(matches!(
            err,
            TokenError::Unavailable {
                status: Some(503),
                attempts: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_server_error_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-2",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = acquirer(&server).acquire(&credential()).await.unwrap();
        assert_eq!(token.access_token, "token-2");
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = acquirer(&server).acquire(&credential()).await.unwrap_err();
        assert!(matches!(err, TokenError::InvalidResponse { .. }));
    }
}
