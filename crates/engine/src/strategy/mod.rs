//! Increment strategies
//!
//! Five protocols for adding one to a shared counter, all written against
//! [`CounterSession`]:
//!
//! | Strategy | Protocol | Exact? |
//! |---|---|---|
//! | Lost-Update | read, commit, write(c+1), commit | no |
//! | Serializable | begin, read, write(c+1), commit; retry on conflict | yes |
//! | In-Place | increment(1), commit | yes |
//! | Row-Locking | read_for_update, write(c+1), commit | yes |
//! | Optimistic | read, commit, cas(v, c+1, v+1), commit; retry while rejected | yes |
//!
//! Every logical increment is its own committed transaction. A fatal error
//! rolls the session back (best effort) and aborts the worker.

mod in_place;
mod lost_update;
mod optimistic;
mod retry;
mod row_locking;
mod serializable;

pub use in_place::InPlace;
pub use lost_update::LostUpdate;
pub use optimistic::Optimistic;
pub use retry::RetryPolicy;
pub use row_locking::RowLocking;
pub use serializable::Serializable;

use counterbench_core::{CounterKey, CounterSession, Error, IsolationLevel, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Selector for one of the five strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Unlocked read, separate write: loses updates
    LostUpdate,
    /// Serializable transaction with retry on conflict
    Serializable,
    /// Relative update evaluated by the store
    InPlace,
    /// Locking read, then write
    RowLocking,
    /// Version check with retry
    Optimistic,
}

impl StrategyKind {
    /// All strategies in report order
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::LostUpdate,
        StrategyKind::Serializable,
        StrategyKind::InPlace,
        StrategyKind::RowLocking,
        StrategyKind::Optimistic,
    ];

    /// Report header
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::LostUpdate => "LOST UPDATE",
            StrategyKind::Serializable => "SERIALIZABLE",
            StrategyKind::InPlace => "IN-PLACE UPDATE",
            StrategyKind::RowLocking => "ROW-LEVEL LOCKING",
            StrategyKind::Optimistic => "OPTIMISTIC CONCURRENCY",
        }
    }

    /// Identifier used in configuration and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            StrategyKind::LostUpdate => "lost-update",
            StrategyKind::Serializable => "serializable",
            StrategyKind::InPlace => "in-place",
            StrategyKind::RowLocking => "row-locking",
            StrategyKind::Optimistic => "optimistic",
        }
    }

    /// Isolation level workers open their sessions with
    pub fn isolation(&self) -> IsolationLevel {
        match self {
            StrategyKind::Serializable => IsolationLevel::Serializable,
            _ => IsolationLevel::ReadCommitted,
        }
    }

    /// Whether the strategy guarantees no lost updates
    pub fn is_exact(&self) -> bool {
        !matches!(self, StrategyKind::LostUpdate)
    }

    /// Instantiate the strategy
    pub fn strategy(&self) -> Box<dyn IncrementStrategy> {
        match self {
            StrategyKind::LostUpdate => Box::new(LostUpdate),
            StrategyKind::Serializable => Box::new(Serializable),
            StrategyKind::InPlace => Box::new(InPlace),
            StrategyKind::RowLocking => Box::new(RowLocking),
            StrategyKind::Optimistic => Box::new(Optimistic),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.id() == normalized)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "unknown strategy '{}'; expected one of: lost-update, serializable, in-place, row-locking, optimistic",
                    s
                ))
            })
    }
}

/// Per-worker parameters of one run
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Worker index, 0-based
    pub worker_id: usize,
    /// Row to increment
    pub key: CounterKey,
    /// Successful increments to perform
    pub iterations: u64,
    /// Conflict retry policy
    pub retry: RetryPolicy,
}

/// What one worker did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WorkerStats {
    /// Worker index
    pub worker_id: usize,
    /// Completed logical increments
    pub successes: u64,
    /// Increment attempts, including retried ones
    pub attempts: u64,
    /// Serialization failures or rejected compare-and-writes
    pub conflicts: u64,
}

impl WorkerStats {
    /// Empty stats for `worker_id`
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }
}

/// A protocol for incrementing the shared counter
pub trait IncrementStrategy: Send + Sync {
    /// Which strategy this is
    fn kind(&self) -> StrategyKind;

    /// Isolation level the session passed to `run` must have
    fn isolation(&self) -> IsolationLevel {
        self.kind().isolation()
    }

    /// Perform `ctx.iterations` increments through `session`
    ///
    /// # Errors
    ///
    /// Fatal store errors, or `RetriesExhausted` under a bounded retry
    /// policy. Conflicts are otherwise handled internally.
    fn run(&self, session: &mut dyn CounterSession, ctx: &WorkerContext) -> Result<WorkerStats>;
}

/// Roll back after a failed attempt, keeping the original error
pub(crate) fn rollback_on_error<T>(session: &mut dyn CounterSession, outcome: Result<T>) -> Result<T> {
    if let Err(e) = &outcome {
        if let Err(rollback_err) = session.rollback() {
            debug!(target: "counterbench::bench", error = %e, %rollback_err, "rollback after error failed");
        }
    }
    outcome
}
