//! Retry budget and backoff shared by token acquisition and Graph calls.

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Exponential backoff with jitter, bounded by a total attempt budget.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Growth factor between consecutive delays
    pub factor: u32,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Extra random delay as a fraction of the computed delay (0.0 - 1.0)
    pub jitter_factor: f64,
    /// Wait applied to a 429 without a usable Retry-After header
    pub default_retry_after: Duration,
    /// Longest wait honoured from a Retry-After header
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200), // 200ms, 800ms, 3200ms
            factor: 4,
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.2,
            default_retry_after: Duration::from_secs(5),
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy with short delays and no jitter, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(10),
            factor: 2,
            max_delay: Duration::from_millis(100),
            jitter_factor: 0.0,
            default_retry_after: Duration::from_millis(10),
            max_retry_after: Duration::from_secs(60),
        }
    }

    /// Whether another attempt is allowed after `attempt` attempts were made
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Backoff before the attempt following `attempt` (1-based), without jitter
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.base_delay
            .saturating_mul(self.factor.saturating_pow(exponent))
            .min(self.max_delay)
    }

    /// Backoff before the attempt following `attempt`, with jitter applied
    pub fn jittered_backoff(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        if self.jitter_factor <= 0.0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(0.0..=self.jitter_factor.min(1.0));
        delay.mul_f64(1.0 + jitter)
    }

    /// Delay requested by a throttled response, capped at `max_retry_after`
    pub fn retry_after(&self, headers: &HeaderMap) -> Duration {
        headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_retry_after)
            .min(self.max_retry_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_default_backoff_sequence() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(800));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(3200));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(policy.backoff_delay(30), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.jittered_backoff(2);
            assert!(delay >= Duration::from_millis(799));
            assert!(delay <= Duration::from_millis(961));
        }
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_retry_after_header() {
        let policy = RetryPolicy::default();
        let mut headers = HeaderMap::new();
        assert_eq!(policy.retry_after(&headers), Duration::from_secs(5));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(policy.retry_after(&headers), Duration::from_secs(2));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(policy.retry_after(&headers), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let policy = RetryPolicy::default();
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("86400"));
        assert_eq!(policy.retry_after(&headers), Duration::from_secs(60));

        let strict = RetryPolicy {
            max_retry_after: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(strict.retry_after(&HeaderMap::new()), Duration::from_secs(1));
    }
}
