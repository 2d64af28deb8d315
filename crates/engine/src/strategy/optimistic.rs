//! Optimistic: version-checked write, retried while rejected
//!
//! The worker reads `(counter, version)` and then writes
//! `(counter + 1, version + 1)` only if the version is still the one it read.
//! A rejected write changed nothing; the worker reads again and retries.

use super::{rollback_on_error, IncrementStrategy, StrategyKind, WorkerContext, WorkerStats};
use counterbench_core::{CounterKey, CounterSession, Result};

/// Compare-and-write loop
#[derive(Debug, Clone, Copy, Default)]
pub struct Optimistic;

impl Optimistic {
    /// One read + compare-and-write; `Ok(false)` if the version moved
    fn attempt(session: &mut dyn CounterSession, key: CounterKey) -> Result<bool> {
        let row = session.read(key)?;
        session.commit()?;
        let applied = session.compare_and_write(key, row.version, row.counter + 1, row.version + 1)?;
        session.commit()?;
        Ok(applied)
    }
}

impl IncrementStrategy for Optimistic {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Optimistic
    }

    fn run(&self, session: &mut dyn CounterSession, ctx: &WorkerContext) -> Result<WorkerStats> {
        let mut stats = WorkerStats::new(ctx.worker_id);
        for _ in 0..ctx.iterations {
            let mut consecutive = 0u64;
            loop {
                stats.attempts += 1;
                let outcome = Self::attempt(session, ctx.key);
                if rollback_on_error(session, outcome)? {
                    stats.successes += 1;
                    break;
                }
                stats.conflicts += 1;
                consecutive += 1;
                ctx.retry
                    .on_conflict(consecutive, self.kind().name(), ctx.worker_id)?;
            }
        }
        Ok(stats)
    }
}
