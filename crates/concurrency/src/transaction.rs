//! Transaction context
//!
//! TransactionContext is the per-transaction state of one session: the rows
//! it read (with their commit stamps), the rows it wrote (buffered until
//! commit) and the row locks it holds.
//!
//! Statement semantics:
//! - Plain reads take no lock and see the latest committed row, or this
//!   transaction's own pending write
//! - Every write statement takes the row lock first and keeps it until the
//!   transaction ends, so concurrent writers of a row are serialized;
//!   compare-and-write only tries the lock and rejects instead of waiting
//! - Writes are computed from the latest committed row *after* the lock is
//!   held, so relative updates never lose increments
//! - Serializable transactions remember the commit stamp of every row they
//!   read; a write to a row that changed since it was read fails immediately,
//!   and the commit re-checks the whole read set

use counterbench_core::{CounterKey, CounterRow, Error, IsolationLevel, Result, SessionId};
use counterbench_storage::{RowLockTable, RowTable};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::time::{Duration, Instant};

use crate::validation::ValidationResult;

/// Error type for commit failures
#[derive(Debug, Clone)]
pub enum CommitError {
    /// Read-set validation found rows committed by someone else
    ValidationFailed(ValidationResult),

    /// Transaction was not in the Active state
    InvalidState(String),
}

impl std::fmt::Display for CommitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitError::ValidationFailed(result) => {
                write!(f, "Commit failed: {} conflict(s)", result.conflict_count())
            }
            CommitError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for CommitError {}

impl From<CommitError> for Error {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::ValidationFailed(result) => Error::conflict(
                result.first_key().unwrap_or_default(),
                format!(
                    "read set invalidated by concurrent commit ({} conflict(s))",
                    result.conflict_count()
                ),
            ),
            CommitError::InvalidState(msg) => Error::InvalidOperation(msg),
        }
    }
}

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Active` → `Validating` (begin commit)
/// - `Validating` → `Committed` (validation passed)
/// - `Validating` → `Aborted` (conflict detected)
/// - `Active` → `Aborted` (rollback or statement conflict)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing statements
    Active,
    /// Transaction is being validated for conflicts
    Validating,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

/// Per-transaction state of a session
#[derive(Debug)]
pub struct TransactionContext {
    /// Unique transaction ID
    pub txn_id: u64,
    /// Session that owns this transaction and its locks
    pub session: SessionId,
    /// Isolation level the transaction runs at
    pub isolation: IsolationLevel,

    /// Rows read and the commit stamp observed (serializable only)
    ///
    /// Only the first read of a row is recorded; later reads must see the
    /// same stamp for the transaction to commit.
    pub read_set: FxHashMap<CounterKey, u64>,

    /// Rows written, buffered until commit
    pub write_set: FxHashMap<CounterKey, CounterRow>,

    /// Row locks held by this transaction
    locked: SmallVec<[CounterKey; 2]>,

    /// Current transaction status
    pub status: TransactionStatus,

    start_time: Instant,
}

impl TransactionContext {
    /// Create an active transaction
    pub fn new(txn_id: u64, session: SessionId, isolation: IsolationLevel) -> Self {
        TransactionContext {
            txn_id,
            session,
            isolation,
            read_set: FxHashMap::default(),
            write_set: FxHashMap::default(),
            locked: SmallVec::new(),
            status: TransactionStatus::Active,
            start_time: Instant::now(),
        }
    }

    // === Statements ===

    /// Plain read: no lock
    pub fn read(&mut self, table: &RowTable, key: CounterKey) -> Result<CounterRow> {
        self.ensure_active()?;
        if let Some(row) = self.write_set.get(&key) {
            return Ok(*row);
        }
        let stored = table.get(&key).ok_or(Error::RowNotFound(key))?;
        if self.isolation.is_serializable() {
            self.read_set.entry(key).or_insert(stored.commit_seq());
        }
        Ok(stored.row())
    }

    /// Locking read: waits for the row lock, then reads
    pub fn read_for_update(
        &mut self,
        table: &RowTable,
        locks: &RowLockTable,
        key: CounterKey,
    ) -> Result<CounterRow> {
        self.ensure_active()?;
        self.lock_row(locks, key);
        self.check_not_stale(table, key)?;
        self.read(table, key)
    }

    /// Overwrite `counter`, keeping the stored version
    pub fn write(
        &mut self,
        table: &RowTable,
        locks: &RowLockTable,
        key: CounterKey,
        counter: i64,
    ) -> Result<()> {
        self.ensure_active()?;
        self.lock_row(locks, key);
        self.check_not_stale(table, key)?;
        let current = self.current_row(table, key)?;
        self.write_set.insert(key, current.with_counter(counter));
        Ok(())
    }

    /// Add `delta` to the latest value of `counter`
    pub fn increment(
        &mut self,
        table: &RowTable,
        locks: &RowLockTable,
        key: CounterKey,
        delta: i64,
    ) -> Result<()> {
        self.ensure_active()?;
        self.lock_row(locks, key);
        self.check_not_stale(table, key)?;
        let current = self.current_row(table, key)?;
        self.write_set
            .insert(key, current.with_counter(current.counter + delta));
        Ok(())
    }

    /// Write `(new_counter, new_version)` only if the version is `expected_version`
    ///
    /// Never waits: a version mismatch, or a row lock held by another
    /// session, rejects the write with `Ok(false)`. On a rejection nothing
    /// is buffered and no lock taken by this statement is kept.
    pub fn compare_and_write(
        &mut self,
        table: &RowTable,
        locks: &RowLockTable,
        key: CounterKey,
        expected_version: i64,
        new_counter: i64,
        new_version: i64,
    ) -> Result<bool> {
        self.ensure_active()?;
        self.check_not_stale(table, key)?;
        if self.current_row(table, key)?.version != expected_version {
            return Ok(false);
        }

        let newly_locked = !self.locked.contains(&key);
        if !locks.try_acquire(key, self.session) {
            return Ok(false);
        }
        if newly_locked {
            self.locked.push(key);
        }

        // A commit may have landed between the check and the lock
        let current = self.current_row(table, key)?;
        if current.version != expected_version {
            if newly_locked {
                self.unlock_row(locks, key);
            }
            return Ok(false);
        }
        self.write_set
            .insert(key, CounterRow::new(new_counter, new_version));
        Ok(true)
    }

    /// Blind write of a whole row; the row need not exist yet
    pub fn put(&mut self, locks: &RowLockTable, key: CounterKey, row: CounterRow) -> Result<()> {
        self.ensure_active()?;
        self.lock_row(locks, key);
        self.write_set.insert(key, row);
        Ok(())
    }

    // === Locks ===

    fn lock_row(&mut self, locks: &RowLockTable, key: CounterKey) {
        if locks.acquire(key, self.session).is_new() {
            self.locked.push(key);
        }
    }

    fn unlock_row(&mut self, locks: &RowLockTable, key: CounterKey) {
        locks.release(key, self.session);
        self.locked.retain(|k| *k != key);
    }

    /// Release every row lock held by this transaction
    pub fn release_locks(&mut self, locks: &RowLockTable) {
        for key in self.locked.drain(..) {
            locks.release(key, self.session);
        }
    }

    /// Rows currently locked by this transaction
    pub fn locked_rows(&self) -> &[CounterKey] {
        &self.locked
    }

    // === Helpers ===

    fn current_row(&self, table: &RowTable, key: CounterKey) -> Result<CounterRow> {
        if let Some(row) = self.write_set.get(&key) {
            return Ok(*row);
        }
        table
            .get(&key)
            .map(|stored| stored.row())
            .ok_or(Error::RowNotFound(key))
    }

    /// Fail if a serializable transaction is about to act on a row that was
    /// committed by someone else after it was read
    fn check_not_stale(&self, table: &RowTable, key: CounterKey) -> Result<()> {
        if !self.isolation.is_serializable() {
            return Ok(());
        }
        match self.read_set.get(&key) {
            Some(read_seq) if *read_seq != table.commit_seq(&key) => Err(Error::conflict(
                key,
                "row was updated by a concurrent transaction",
            )),
            _ => Ok(()),
        }
    }

    // === State Management ===

    /// Check if transaction is in Active state
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Check if transaction is committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed)
    }

    /// Check if transaction is aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// Check if transaction can accept statements
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if not in `Active` state.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::invalid_operation(format!(
                "Transaction {} is not active: {:?}",
                self.txn_id, self.status
            )))
        }
    }

    /// Transition `Active` → `Validating`
    pub fn mark_validating(&mut self) -> std::result::Result<(), CommitError> {
        if !self.is_active() {
            return Err(CommitError::InvalidState(format!(
                "Cannot commit transaction {} from {:?} state - must be Active",
                self.txn_id, self.status
            )));
        }
        self.status = TransactionStatus::Validating;
        Ok(())
    }

    /// Transition `Validating` → `Committed`
    pub fn mark_committed(&mut self) -> std::result::Result<(), CommitError> {
        match self.status {
            TransactionStatus::Validating => {
                self.status = TransactionStatus::Committed;
                Ok(())
            }
            _ => Err(CommitError::InvalidState(format!(
                "Cannot commit transaction {} from state {:?}",
                self.txn_id, self.status
            ))),
        }
    }

    /// Abort the transaction, discarding buffered writes
    ///
    /// Locks are not released here; see [`release_locks`](Self::release_locks).
    /// Aborting a committed or already aborted transaction does nothing.
    pub fn mark_aborted(&mut self, reason: impl Into<String>) {
        if matches!(
            self.status,
            TransactionStatus::Active | TransactionStatus::Validating
        ) {
            self.status = TransactionStatus::Aborted {
                reason: reason.into(),
            };
            self.write_set.clear();
        }
    }

    /// Number of buffered writes
    pub fn write_count(&self) -> usize {
        self.write_set.len()
    }

    /// Time since the transaction started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
