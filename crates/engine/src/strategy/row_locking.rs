//! Row-Locking: locking read, then write, in one transaction
//!
//! `read_for_update` waits for the row lock and keeps it until commit, so
//! between the read and the commit no other worker can read-for-update or
//! write the row. Workers queue on the lock.

use super::{rollback_on_error, IncrementStrategy, StrategyKind, WorkerContext, WorkerStats};
use counterbench_core::{CounterKey, CounterSession, Result};

/// Pessimistic read-modify-write
#[derive(Debug, Clone, Copy, Default)]
pub struct RowLocking;

impl RowLocking {
    fn increment_once(session: &mut dyn CounterSession, key: CounterKey) -> Result<()> {
        let row = session.read_for_update(key)?;
        session.write(key, row.counter + 1)?;
        session.commit()
    }
}

impl IncrementStrategy for RowLocking {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RowLocking
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
