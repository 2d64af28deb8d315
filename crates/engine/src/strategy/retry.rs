//! Retry policy for strategies that retry on conflict

use counterbench_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Configuration for conflict retry behavior
///
/// Applies to the Serializable strategy (serialization failures) and the
/// Optimistic strategy (rejected compare-and-write). The default retries
/// forever without backoff.
///
/// # Example
/// ```ignore
/// let policy = RetryPolicy::bounded(50).with_backoff(1, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum consecutive retries of one increment (`None` = unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u64>,
    /// Base delay between retries in milliseconds (exponential backoff)
    #[serde(default)]
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    #[serde(default)]
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Retry forever, no backoff
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Give up after `max_retries` consecutive conflicts
    pub fn bounded(max_retries: u64) -> Self {
        Self {
            max_retries: Some(max_retries),
            ..Default::default()
        }
    }

    /// Set exponential backoff bounds
    pub fn with_backoff(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Calculate delay before retry number `attempt` (0-based)
    pub fn calculate_delay(&self, attempt: u64) -> Duration {
        // Cap the shift to prevent overflow (1 << 63 is the max for u64)
        let shift = attempt.min(63);
        let multiplier = 1u64 << shift;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }

    /// Decide what to do after the `consecutive`-th conflict in a row
    ///
    /// Sleeps for the backoff delay and returns `Ok(())` if another attempt
    /// is allowed, or `Error::RetriesExhausted` otherwise.
    pub fn on_conflict(&self, consecutive: u64, strategy: &str, worker: usize) -> Result<()> {
        if let Some(max) = self.max_retries {
            if consecutive > max {
                warn!(
                    target: "counterbench::bench",
                    strategy,
                    worker,
                    retries = consecutive,
                    "retry limit reached"
                );
                return Err(Error::RetriesExhausted {
                    strategy: strategy.to_string(),
                    worker,
                    retries: consecutive,
                });
            }
        }
        let delay = self.calculate_delay(consecutive.saturating_sub(1));
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        Ok(())
    }
}
