use confique::Config;
use graph_engine::RetryPolicy;
use std::time::Duration;

/// Configuration of the outbound Graph and identity provider calls
#[derive(Debug, Config, Clone)]
pub struct GraphConfig {
    /// Graph API base URL (default: https://graph.microsoft.com/v1.0)
    #[config(env = "ADMIN_GRAPH_ENDPOINT", default = "https://graph.microsoft.com/v1.0")]
    pub endpoint: String,

    /// Scope requested with the client-credentials grant
    /// (default: https://graph.microsoft.com/.default)
    #[config(env = "ADMIN_GRAPH_SCOPE", default = "https://graph.microsoft.com/.default")]
    pub scope: String,

    /// Identity provider authority (default: https://login.microsoftonline.com)
    #[config(env = "ADMIN_GRAPH_AUTHORITY", default = "https://login.microsoftonline.com")]
    pub authority: String,

    /// Timeout of a single outbound request in seconds (default: 30)
    #[config(env = "ADMIN_GRAPH_REQUEST_TIMEOUT_SECS", default = 30)]
    pub request_timeout_secs: u64,

    /// Total attempts for one logical call, including the first (default: 3)
    #[config(env = "ADMIN_GRAPH_MAX_ATTEMPTS", default = 3)]
    pub max_attempts: u32,

    /// Backoff before the second attempt in milliseconds (default: 200)
    #[config(env = "ADMIN_GRAPH_BASE_BACKOFF_MS", default = 200)]
    pub base_backoff_ms: u64,

    /// Growth factor between consecutive backoffs (default: 4)
    #[config(env = "ADMIN_GRAPH_BACKOFF_FACTOR", default = 4)]
    pub backoff_factor: u32,

    /// Upper bound for a single backoff in seconds (default: 60)
    #[config(env = "ADMIN_GRAPH_MAX_BACKOFF_SECS", default = 60)]
    pub max_backoff_secs: u64,

    /// Wait after a 429 without Retry-After, in seconds (default: 5)
    #[config(env = "ADMIN_GRAPH_DEFAULT_RETRY_AFTER_SECS", default = 5)]
    pub default_retry_after_secs: u64,

    /// Longest Retry-After wait honoured, in seconds (default: 60)
    #[config(env = "ADMIN_GRAPH_MAX_RETRY_AFTER_SECS", default = 60)]
    pub max_retry_after_secs: u64,

    /// Users created concurrently by a batch request (default: 4)
    #[config(env = "ADMIN_GRAPH_BATCH_CONCURRENCY", default = 4)]
    pub batch_concurrency: usize,
}

impl GraphConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy shared by token acquisition and Graph calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_backoff_ms),
            factor: self.backoff_factor,
            max_delay: Duration::from_secs(self.max_backoff_secs),
            default_retry_after: Duration::from_secs(self.default_retry_after_secs),
            max_retry_after: Duration::from_secs(self.max_retry_after_secs),
            ..RetryPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_from_config() {
        let config = GraphConfig {
            endpoint: "https://graph.microsoft.com/v1.0".to_string(),
            scope: "https://graph.microsoft.com/.default".to_string(),
            authority: "https://login.microsoftonline.com".to_string(),
            request_timeout_secs: 30,
            max_attempts: 5,
            base_backoff_ms: 100,
            backoff_factor: 2,
            max_backoff_secs: 10,
            default_retry_after_secs: 7,
            max_retry_after_secs: 20,
            batch_concurrency: 4,
        };

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(policy.default_retry_after, Duration::from_secs(7));
        assert_eq!(policy.max_retry_after, Duration::from_secs(20));
        assert_eq!(policy.jitter_factor, RetryPolicy::default().jitter_factor);
    }
}
