//! In-memory transactional counter database
//!
//! `CounterDatabase` is the default [`CounterStore`]. It layers the
//! concurrency crate's transactions over the storage crate's row table and
//! row locks:
//!
//! - plain reads see the latest committed row and take no lock
//! - every write statement takes the row lock and keeps it until the
//!   transaction ends
//! - writes are buffered and applied at commit under the commit lock
//! - serializable transactions are validated at commit (first committer wins)
//!
//! Every statement pays the configured [`StatementLatency`] first, so
//! workers interleave the way they would against a networked database.

mod config;
mod session;

pub use config::{DatabaseConfig, StatementLatency};
pub use session::MemorySession;

use crate::coordinator::{TransactionCoordinator, TransactionMetrics};
use counterbench_core::{
    CounterKey, CounterRow, CounterSession, CounterStore, IsolationLevel, Result, SessionId,
};
use counterbench_storage::{EventKind, EventLog, RowLockTable, RowTable, StoreEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// State shared by the database handle and all of its sessions
pub(crate) struct DatabaseInner {
    pub(crate) config: DatabaseConfig,
    pub(crate) table: RowTable,
    pub(crate) locks: RowLockTable,
    pub(crate) coordinator: TransactionCoordinator,
    pub(crate) events: Option<EventLog>,
    next_session: AtomicU64,
}

impl DatabaseInner {
    pub(crate) fn record(&self, session: SessionId, key: CounterKey, kind: EventKind) {
        if let Some(log) = &self.events {
            log.record(session, key, kind);
        }
    }
}

/// In-memory transactional counter database
///
/// Cloning the handle is cheap; clones share the same data.
#[derive(Clone)]
pub struct CounterDatabase {
    inner: Arc<DatabaseInner>,
}

impl CounterDatabase {
    /// Create an empty database
    pub fn new(config: DatabaseConfig) -> Self {
        let events = config.record_events.then(EventLog::new);
        CounterDatabase {
            inner: Arc::new(DatabaseInner {
                config,
                table: RowTable::new(),
                locks: RowLockTable::new(),
                coordinator: TransactionCoordinator::new(0),
                events,
                next_session: AtomicU64::new(SessionId::SYSTEM.as_u64() + 1),
            }),
        }
    }

    /// Configuration the database was created with
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// Open a session with a concrete type
    pub fn session(&self, isolation: IsolationLevel) -> MemorySession {
        let id = SessionId::new(self.inner.next_session.fetch_add(1, Ordering::Relaxed));
        MemorySession::new(Arc::clone(&self.inner), id, isolation)
    }

    /// Transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        self.inner.coordinator.metrics()
    }

    /// Number of row lock acquisitions that had to wait
    pub fn lock_waits(&self) -> u64 {
        self.inner.locks.wait_count()
    }

    /// Recorded events, oldest first
    ///
    /// Empty unless the database was created with `record_events`.
    pub fn events(&self) -> Vec<StoreEvent> {
        self.inner
            .events
            .as_ref()
            .map(EventLog::snapshot)
            .unwrap_or_default()
    }

    /// Drop all recorded events
    pub fn clear_events(&self) {
        if let Some(log) = &self.inner.events {
            log.clear();
        }
    }
}

impl Default for CounterDatabase {
    fn default() -> Self {
        Self::new(DatabaseConfig::default())
    }
}

impl CounterStore for CounterDatabase {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn open_session(&self, isolation: IsolationLevel) -> Result<Box<dyn CounterSession>> {
        Ok(Box::new(self.session(isolation)))
    }

    fn reset(&self, key: CounterKey) -> Result<()> {
        let inner = &self.inner;
        let mut txn = inner
            .coordinator
            .start_transaction(SessionId::SYSTEM, IsolationLevel::ReadCommitted);
        if let Err(e) = txn.put(&inner.locks, key, CounterRow::ZERO) {
            inner.coordinator.rollback(&mut txn, &inner.locks, "reset failed");
            return Err(e);
        }
        inner
            .coordinator
            .commit(&mut txn, &inner.table, &inner.locks, None)?;
        inner.record(SessionId::SYSTEM, key, EventKind::Reset);
        info!(target: "counterbench::txn", %key, backend = "memory", "counter reset");
        Ok(())
    }
}
