//! Lost-Update: unlocked read, separate write
//!
//! The read and the write run in separate transactions with nothing tying
//! them together, so two workers can both read `c` and both write `c + 1`.
//! This is the baseline the other strategies are measured against and is
//! intentionally left lossy.

use super::{rollback_on_error, IncrementStrategy, StrategyKind, WorkerContext, WorkerStats};
use counterbench_core::{CounterKey, CounterSession, Result};

/// Read-then-write with no coordination
#[derive(Debug, Clone, Copy, Default)]
pub struct LostUpdate;

impl LostUpdate {
    fn increment_once(session: &mut dyn CounterSession, key: CounterKey) -> Result<()> {
        let row = session.read(key)?;
        session.commit()?;
        session.write(key, row.counter + 1)?;
        session.commit()
    }
}

impl IncrementStrategy for LostUpdate {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LostUpdate
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
