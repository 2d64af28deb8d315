//! Transaction manager for coordinating commit operations
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. acquire commit lock
//! 2. mark_validating()
//! 3. validate_transaction() - serializable read set only
//! 4. IF conflicts: abort, release row locks, return error
//! 5. allocate commit_seq (only if something was written)
//! 6. apply write set to the row table
//! 7. mark_committed()
//! 8. release row locks
//! ```
//!
//! Steps 2-7 run under the commit lock, so no other transaction can commit
//! between validation and apply. Row locks are released last: a session
//! waiting on the row lock always observes the committed write.

use crate::validation::validate_transaction;
use crate::{CommitError, TransactionContext};
use counterbench_core::{IsolationLevel, SessionId};
use counterbench_storage::{EventKind, EventLog, RowLockTable, RowTable};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Manages transaction IDs, commit stamps and atomic commits
pub struct TransactionManager {
    /// Latest commit stamp handed out
    version: AtomicU64,

    /// Next transaction ID
    next_txn_id: AtomicU64,

    /// Serializes validate-and-apply
    commit_lock: Mutex<()>,
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new(initial_version: u64) -> Self {
        TransactionManager {
            version: AtomicU64::new(initial_version),
            next_txn_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
        }
    }

    /// Get the latest commit stamp
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Allocate next commit stamp
    pub fn allocate_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start a transaction for `session`
    pub fn begin(&self, session: SessionId, isolation: IsolationLevel) -> TransactionContext {
        TransactionContext::new(self.next_txn_id(), session, isolation)
    }

    /// Commit a transaction atomically
    ///
    /// Returns the commit stamp assigned to the written rows, or the current
    /// stamp for a read-only transaction. On failure the transaction is
    /// aborted and its row locks are released before returning.
    ///
    /// When `events` is given, a `Committed` event is recorded per written
    /// row (or a `Conflict` event on validation failure) before any row lock
    /// is released.
    pub fn commit(
        &self,
        txn: &mut TransactionContext,
        table: &RowTable,
        locks: &RowLockTable,
        events: Option<&EventLog>,
    ) -> std::result::Result<u64, CommitError> {
        let outcome = {
            let _guard = self.commit_lock.lock();
            self.validate_and_apply(txn, table, events)
        };
        txn.release_locks(locks);
        outcome
    }

    fn validate_and_apply(
        &self,
        txn: &mut TransactionContext,
        table: &RowTable,
        events: Option<&EventLog>,
    ) -> std::result::Result<u64, CommitError> {
        txn.mark_validating()?;

        let validation = validate_transaction(txn, table);
        if !validation.is_valid() {
            if let Some(log) = events {
                for conflict in &validation.conflicts {
                    log.record(txn.session, conflict.key(), EventKind::Conflict);
                }
            }
            txn.mark_aborted(format!(
                "Commit failed: {} conflict(s) detected",
                validation.conflict_count()
            ));
            debug!(
                target: "counterbench::txn",
                txn_id = txn.txn_id,
                elapsed_us = txn.elapsed().as_micros() as u64,
                "Validation failed"
            );
            return Err(CommitError::ValidationFailed(validation));
        }

        let commit_seq = if txn.write_set.is_empty() {
            self.current_version()
        } else {
            let seq = self.allocate_version();
            for (key, row) in txn.write_set.iter() {
                table.apply(*key, *row, seq);
                if let Some(log) = events {
                    log.record(
                        txn.session,
                        *key,
                        EventKind::Committed {
                            counter: row.counter,
                            version: row.version,
                        },
                    );
                }
            }
            seq
        };

        txn.mark_committed()?;
        trace!(
            target: "counterbench::txn",
            txn_id = txn.txn_id,
            commit_seq,
            elapsed_us = txn.elapsed().as_micros() as u64,
            "Transaction applied"
        );
        Ok(commit_seq)
    }

    /// Abort a transaction and release its row locks
    pub fn abort(&self, txn: &mut TransactionContext, locks: &RowLockTable, reason: impl Into<String>) {
        txn.mark_aborted(reason);
        txn.release_locks(locks);
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(0)
    }
}
