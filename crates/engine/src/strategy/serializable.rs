//! Serializable: read-modify-write at the strongest isolation level
//!
//! Two workers that read the same value cannot both commit: the second one
//! fails with a serialization conflict, rolls back, and retries the same
//! logical increment with a fresh read.

use super::{rollback_on_error, IncrementStrategy, StrategyKind, WorkerContext, WorkerStats};
use counterbench_core::{CounterKey, CounterSession, Result};
use tracing::debug;

/// Serializable transaction with retry on conflict
#[derive(Debug, Clone, Copy, Default)]
pub struct Serializable;

impl Serializable {
    fn attempt(session: &mut dyn CounterSession, key: CounterKey) -> Result<()> {
        session.begin()?;
        let row = session.read(key)?;
        session.write(key, row.counter + 1)?;
        session.commit()
    }
}

impl IncrementStrategy for Serializable {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Serializable
    }

    fn run(&self, session: &mut dyn CounterSession, ctx: &WorkerContext) -> Result<WorkerStats> {
        let mut stats = WorkerStats::new(ctx.worker_id);
        for _ in 0..ctx.iterations {
            let mut consecutive = 0u64;
            loop {
                stats.attempts += 1;
                match Self::attempt(session, ctx.key) {
                    Ok(()) => {
                        stats.successes += 1;
                        break;
                    }
                    Err(e) if e.is_conflict() => {
                        stats.conflicts += 1;
                        consecutive += 1;
                        session.rollback()?;
                        debug!(
                            target: "counterbench::bench",
                            worker = ctx.worker_id,
                            consecutive,
                            error = %e,
                            "serialization failure, retrying"
                        );
                        ctx.retry
                            .on_conflict(consecutive, self.kind().name(), ctx.worker_id)?;
                    }
                    Err(e) => return rollback_on_error(session, Err(e)),
                }
            }
        }
        Ok(stats)
    }
}
