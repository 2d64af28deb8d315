//! Outcome evaluator
//!
//! Compares the final counter against the number of increments the workers
//! performed.

use crate::driver::serialize_secs;
use counterbench_core::{CounterKey, CounterStore, Error, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Correctness summary of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Increments the workers performed
    pub expected_total: i64,
    /// Counter value read after the run
    pub final_counter: i64,
    /// `expected_total - final_counter`
    pub lost_updates: i64,
    /// `final_counter / expected_total * 100`
    pub accuracy_percent: f64,
    /// Wall-clock duration of the run
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl Outcome {
    /// Build an outcome from the final counter value
    pub fn new(expected_total: i64, final_counter: i64, duration: Duration) -> Self {
        Self {
            expected_total,
            final_counter,
            lost_updates: expected_total - final_counter,
            accuracy_percent: final_counter as f64 / expected_total as f64 * 100.0,
            duration,
        }
    }

    /// No update was lost or duplicated
    pub fn is_exact(&self) -> bool {
        self.lost_updates == 0
    }

    /// The counter ended above the number of increments performed
    pub fn is_double_counted(&self) -> bool {
        self.lost_updates < 0
    }
}

/// Read the counter once and compute the outcome
///
/// # Errors
///
/// `InvalidConfig` if `expected_total` is not positive; otherwise any error
/// from the read (`RowNotFound` if the row is missing).
pub fn evaluate(
    store: &dyn CounterStore,
    key: CounterKey,
    expected_total: i64,
    duration: Duration,
) -> Result<Outcome> {
    if expected_total <= 0 {
        return Err(Error::InvalidConfig(format!(
            "expected total must be positive, got {}",
            expected_total
        )));
    }
    let row = store.read(key)?;
    let outcome = Outcome::new(expected_total, row.counter, duration);
    if outcome.is_double_counted() {
        warn!(
            target: "counterbench::bench",
            %key,
            expected = expected_total,
            actual = row.counter,
            "counter exceeds increments performed"
        );
    }
    Ok(outcome)
}
