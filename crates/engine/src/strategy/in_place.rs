//! In-Place: relative update evaluated by the store
//!
//! `counter = counter + 1` is computed under the row lock by the store
//! itself. The worker never sees the value, so there is nothing to go stale.

use super::{rollback_on_error, IncrementStrategy, StrategyKind, WorkerContext, WorkerStats};
use counterbench_core::{CounterKey, CounterSession, Result};

/// Single relative update per increment
#[derive(Debug, Clone, Copy, Default)]
pub struct InPlace;

impl InPlace {
    fn increment_once(session: &mut dyn CounterSession, key: CounterKey) -> Result<()> {
        session.increment(key, 1)?;
        session.commit()
    }
}

impl IncrementStrategy for InPlace {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InPlace
    }

    fn run(&self, session: &mut dyn CounterSession, ctx: &WorkerContext) -> Result<WorkerStats> {
        let mut stats = WorkerStats::new(ctx.worker_id);
        for _ in 0..ctx.iterations {
            stats.attempts += 1;
            let outcome = Self::increment_once(session, ctx.key);
            rollback_on_error(session, outcome)?;
            stats.successes += 1;
        }
        Ok(stats)
    }
}
