use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Pause between consecutive fetch requests (per category / subreddit).
    pub request_delay_ms: u64,
    /// Pause between consecutive per-post reply generations and reports.
    pub post_delay_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            request_delay_ms: 500,
            post_delay_ms: 1_000,
            max_retries: 2,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
        }
    }
}

impl BackoffPolicy {
    /// No waits and no retries.
    pub fn immediate() -> Self {
        Self {
            request_delay_ms: 0,
            post_delay_ms: 0,
            max_retries: 0,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn post_delay(&self) -> Duration {
        Duration::from_millis(self.post_delay_ms)
    }

    /// Wait before retry number `attempt` (0-based): doubles each time, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }

    pub fn should_retry(&self, attempt: u32, status: u16) -> bool {
        attempt < self.max_retries && is_retryable(status)
    }
}

pub fn is_retryable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
