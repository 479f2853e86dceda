//! Retry with bounded exponential backoff.

pub mod coordinator;
pub mod stats;

pub use coordinator::{ErrorInfo, RetryCoordinator};
pub use stats::{ErrorStats, StatsSink, StatsSnapshot};

use std::time::Duration;

/// Retry policy configuration.
///
/// `max_delay` is expected to be at least `base_delay`; [`delay_for`]
/// clamps against the larger of the two so a misconfigured policy still
/// honors `delay_for(0) == base_delay`.
///
/// [`delay_for`]: RetryPolicy::delay_for
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Exponential growth factor (> 1).
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry following attempt `attempt` (0-based):
    /// `min(base_delay * backoff_factor^attempt, max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let cap = self.max_delay.max(self.base_delay);
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        Duration::from_secs_f64(delay.min(cap.as_secs_f64()))
    }
}
