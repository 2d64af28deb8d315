//! Transaction coordinator for the in-memory database
//!
//! The TransactionCoordinator wraps TransactionManager and adds:
//! - Transaction metrics (started, committed, aborted)
//! - Conversion of commit failures into `counterbench_core::Error`

use counterbench_concurrency::{TransactionContext, TransactionManager};
use counterbench_core::{IsolationLevel, Result, SessionId};
use counterbench_storage::{EventLog, RowLockTable, RowTable};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Transaction coordinator for the database
///
/// # Memory Ordering
///
/// The metric counters use Relaxed ordering: they are observational only and
/// do not synchronize any other memory operations.
pub struct TransactionCoordinator {
    /// Transaction manager for ID/stamp allocation and commit
    manager: TransactionManager,
    /// Active transaction count - uses Relaxed ordering
    active_count: AtomicU64,
    /// Total transactions started - uses Relaxed ordering
    total_started: AtomicU64,
    /// Total transactions committed - uses Relaxed ordering
    total_committed: AtomicU64,
    /// Total transactions aborted - uses Relaxed ordering
    total_aborted: AtomicU64,
}

impl TransactionCoordinator {
    /// Create a coordinator whose first commit stamp follows `initial_version`
    pub fn new(initial_version: u64) -> Self {
        Self {
            manager: TransactionManager::new(initial_version),
            active_count: AtomicU64::new(0),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_aborted: AtomicU64::new(0),
        }
    }

    /// Start a new transaction owned by `session`
    pub fn start_transaction(
        &self,
        session: SessionId,
        isolation: IsolationLevel,
    ) -> TransactionContext {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);

        let txn = self.manager.begin(session, isolation);
        debug!(target: "counterbench::txn", txn_id = txn.txn_id, %session, %isolation, "Transaction started");
        txn
    }

    /// Commit a transaction through the concurrency layer
    ///
    /// On failure the transaction is already aborted and its locks released.
    pub fn commit(
        &self,
        txn: &mut TransactionContext,
        table: &RowTable,
        locks: &RowLockTable,
        events: Option<&EventLog>,
    ) -> Result<u64> {
        match self.manager.commit(txn, table, locks, events) {
            Ok(version) => {
                self.record_commit();
                debug!(target: "counterbench::txn", txn_id = txn.txn_id, commit_seq = version, "Transaction committed");
                Ok(version)
            }
            Err(e) => {
                self.record_abort();
                debug!(target: "counterbench::txn", txn_id = txn.txn_id, error = %e, "Transaction aborted");
                Err(e.into())
            }
        }
    }

    /// Roll back a transaction and release its locks
    pub fn rollback(&self, txn: &mut TransactionContext, locks: &RowLockTable, reason: &str) {
        self.manager.abort(txn, locks, reason);
        self.record_abort();
        debug!(target: "counterbench::txn", txn_id = txn.txn_id, reason, "Transaction rolled back");
    }

    fn record_commit(&self) {
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
        self.total_committed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_abort(&self) {
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Latest commit stamp
    pub fn current_version(&self) -> u64 {
        self.manager.current_version()
    }

    /// Snapshot of the transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        let total_started = self.total_started.load(Ordering::Relaxed);
        let total_committed = self.total_committed.load(Ordering::Relaxed);
        let total_aborted = self.total_aborted.load(Ordering::Relaxed);

        let commit_rate = if total_started > 0 {
            total_committed as f64 / total_started as f64
        } else {
            0.0
        };

        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started,
            total_committed,
            total_aborted,
            commit_rate,
        }
    }
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Transaction metrics
#[derive(Debug, Clone, Serialize)]
pub struct TransactionMetrics {
    /// Currently open transactions
    pub active_count: u64,
    /// Total transactions started
    pub total_started: u64,
    /// Total transactions committed
    pub total_committed: u64,
    /// Total transactions aborted (rollbacks and failed commits)
    pub total_aborted: u64,
    /// Committed / started
    pub commit_rate: f64,
}
