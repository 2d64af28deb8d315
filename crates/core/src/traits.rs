//! Core traits for the counter store abstraction
//!
//! This module defines the CounterStore and CounterSession traits that the
//! strategies are written against. Any transactional backend (the in-memory
//! database, SQLite, a network database) can be benchmarked by implementing
//! them.
//!
//! # Transaction model
//!
//! Sessions use implicit transactions: the first statement executed outside a
//! transaction opens one at the session's isolation level, and it stays open
//! until `commit()` or `rollback()`. `begin()` opens one explicitly.
//! Calling `commit()` or `rollback()` with no open transaction is a no-op.

use crate::error::Result;
use crate::types::{CounterKey, CounterRow, IsolationLevel, SessionId};

/// A store holding keyed counter rows
///
/// Thread safety: a store is shared by every worker of a run, so all methods
/// must be safe to call concurrently (requires Send + Sync). Each worker opens
/// its own session; sessions are never shared.
pub trait CounterStore: Send + Sync {
    /// Short backend name used in logs and reports (e.g. `"memory"`)
    fn backend(&self) -> &'static str;

    /// Open an isolated session at the requested isolation level
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot provide a new session
    /// (connection failure).
    fn open_session(&self, isolation: IsolationLevel) -> Result<Box<dyn CounterSession>>;

    /// Create or overwrite the row for `key` with `(counter=0, version=0)`
    ///
    /// Idempotent. The reset is committed before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn reset(&self, key: CounterKey) -> Result<()>;

    /// Plain read of the committed row through a fresh session
    ///
    /// # Errors
    ///
    /// Returns `Error::RowNotFound` if the row does not exist, or a backend error.
    fn read(&self, key: CounterKey) -> Result<CounterRow> {
        let mut session = self.open_session(IsolationLevel::ReadCommitted)?;
        let row = session.read(key)?;
        session.commit()?;
        Ok(row)
    }
}

/// One worker's connection to a [`CounterStore`]
///
/// A session owns at most one open transaction at a time. Row locks acquired
/// inside a transaction are held until it commits or rolls back.
pub trait CounterSession: Send {
    /// Identity of this session (owner of its row locks)
    fn id(&self) -> SessionId;

    /// Isolation level the session was opened with
    fn isolation(&self) -> IsolationLevel;

    /// Explicitly start a transaction
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOperation` if a transaction is already open.
    fn begin(&mut self) -> Result<()>;

    /// Plain read, no locking
    ///
    /// Sees the latest committed row, or this transaction's own pending write.
    /// The value may be stale by the time the caller acts on it.
    fn read(&mut self, key: CounterKey) -> Result<CounterRow>;

    /// Read that acquires the exclusive row lock
    ///
    /// Blocks until the lock is available. The lock is held until the
    /// enclosing transaction ends.
    fn read_for_update(&mut self, key: CounterKey) -> Result<CounterRow>;

    /// Unconditional overwrite of `counter`; `version` is left unchanged
    fn write(&mut self, key: CounterKey, counter: i64) -> Result<()>;

    /// Relative update `counter = counter + delta`, evaluated by the store
    ///
    /// There is no client-visible read: the store computes the new value
    /// atomically under its row lock.
    fn increment(&mut self, key: CounterKey, delta: i64) -> Result<()>;

    /// Write only if the stored version still equals `expected_version`
    ///
    /// Returns `Ok(true)` if the write applied and `Ok(false)` on a version
    /// mismatch, in which case nothing changed. Never blocks on a conflict.
    fn compare_and_write(
        &mut self,
        key: CounterKey,
        expected_version: i64,
        new_counter: i64,
        new_version: i64,
    ) -> Result<bool>;

    /// Commit the open transaction (no-op if none is open)
    ///
    /// # Errors
    ///
    /// A serializable transaction whose reads were invalidated by a concurrent
    /// commit fails with `Error::SerializationConflict`. The transaction is
    /// rolled back and its locks released before the error is returned.
    fn commit(&mut self) -> Result<()>;

    /// Discard the open transaction and release its locks (no-op if none is open)
    fn rollback(&mut self) -> Result<()>;
}
