//! Per-provider retry configuration

use std::time::Duration;

/// Retry behavior for one provider client.
///
/// Consumed by the single retry loop in [`ApiClient::request`]; providers
/// differ only in this record, never in the loop itself.
///
/// [`ApiClient::request`]: crate::transport::ApiClient::request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1).
    pub max_retries: u32,
    /// Backoff for attempt n (0-based) is `base * 2^n`.
    pub backoff_base: Duration,
    /// Ceiling on a single backoff sleep, if any.
    pub backoff_cap: Option<Duration>,
    /// Treat 403 as retryable (GitHub secondary rate limits).
    pub retry_on_forbidden: bool,
    /// Sleep for `Retry-After` seconds on 429/403 before the backoff sleep.
    pub honor_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: None,
            retry_on_forbidden: false,
            honor_retry_after: false,
        }
    }
}

impl RetryPolicy {
    /// Whether a response status should be retried at all.
    pub fn is_retryable(&self, status: u16) -> bool {
        status == 429 || status >= 500 || (self.retry_on_forbidden && status == 403)
    }

    /// Exponential backoff for the given 0-based attempt index.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let wait = self.backoff_base.saturating_mul(2u32.saturating_pow(attempt));
        match self.backoff_cap {
            Some(cap) => wait.min(cap),
            None => wait,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_respects_cap() {
        let policy = RetryPolicy {
            backoff_base: Duration::from_secs(2),
            backoff_cap: Some(Duration::from_secs(120)),
            ..Default::default()
        };
        assert_eq!(policy.backoff(0), Duration::from_secs(2));
        assert_eq!(policy.backoff(5), Duration::from_secs(64));
        assert_eq!(policy.backoff(6), Duration::from_secs(120));
        assert_eq!(policy.backoff(10), Duration::from_secs(120));
    }

    #[test]
    fn default_retryable_statuses() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(429));
        assert!(policy.is_retryable(500));
        assert!(policy.is_retryable(503));
        assert!(!policy.is_retryable(403));
        assert!(!policy.is_retryable(404));
        assert!(!policy.is_retryable(400));
    }

    #[test]
    fn forbidden_retryable_when_enabled() {
        let policy = RetryPolicy {
            retry_on_forbidden: true,
            ..Default::default()
        };
        assert!(policy.is_retryable(403));
        assert!(!policy.is_retryable(404));
    }
}
