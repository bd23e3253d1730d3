//! Retry policy for deadlocked flushes.
//!
//! A deadlocked batch is rolled back and the whole flush is retried
//! on the same buffer. The policy answers two questions per retry:
//! whether another attempt is allowed, and how long to wait first.

use std::time::Duration;

/// Backoff policy for flush retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retries; `None` retries until interrupted.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Whether retry number `attempt` (zero-based) is allowed.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    /// Delay before retry number `attempt` (zero-based): the base
    /// delay doubled per prior retry, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}
