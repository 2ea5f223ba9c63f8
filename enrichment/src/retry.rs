//! Retry budget and exponential backoff, ground identically to the
//! nearest production analogue's request retry policy.

use std::time::Duration;

/// Configuration for retry behavior on transient errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub backoff_factor: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 500,
            backoff_factor: 2,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// Backoff duration before the given (zero-indexed) retry attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponential = self.backoff_ms.saturating_mul(self.backoff_factor.saturating_pow(attempt));
        Duration::from_millis(exponential.min(self.max_backoff_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let cfg = RetryConfig {
            max_retries: 5,
            backoff_ms: 100,
            backoff_factor: 2,
            max_backoff_ms: 1000,
        };
        assert_eq!(cfg.backoff_for(0), Duration::from_millis(100));
        assert_eq!(cfg.backoff_for(1), Duration::from_millis(200));
        assert_eq!(cfg.backoff_for(10), Duration::from_millis(1000));
    }
}
