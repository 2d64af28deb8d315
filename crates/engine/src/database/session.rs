//! Sessions of the in-memory database

use super::DatabaseInner;
use counterbench_concurrency::TransactionContext;
use counterbench_core::{
    CounterKey, CounterRow, CounterSession, Error, IsolationLevel, Result, SessionId,
};
use counterbench_storage::EventKind;
use std::sync::Arc;
use tracing::trace;

/// One connection to a [`CounterDatabase`](super::CounterDatabase)
///
/// Any statement error rolls back the open transaction, like a relational
/// database that refuses further statements in an aborted transaction. A
/// following `rollback()` is then a no-op. Dropping the session rolls back
/// whatever is still open.
pub struct MemorySession {
    db: Arc<DatabaseInner>,
    id: SessionId,
    isolation: IsolationLevel,
    txn: Option<TransactionContext>,
}

impl MemorySession {
    pub(crate) fn new(db: Arc<DatabaseInner>, id: SessionId, isolation: IsolationLevel) -> Self {
        MemorySession {
            db,
            id,
            isolation,
            txn: None,
        }
    }

    /// Whether a transaction is currently open
    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    /// Run one statement inside the open transaction, opening one if needed
    fn statement<T>(
        &mut self,
        f: impl FnOnce(&DatabaseInner, &mut TransactionContext) -> Result<T>,
    ) -> Result<T> {
        self.db.config.latency.pay();

        let db = &*self.db;
        let (id, isolation) = (self.id, self.isolation);
        let txn = self
            .txn
            .get_or_insert_with(|| db.coordinator.start_transaction(id, isolation));

        let outcome = f(db, txn);
        if let Err(e) = &outcome {
            if e.is_conflict() {
                db.record(id, conflict_key(e), EventKind::Conflict);
            }
            if let Some(mut txn) = self.txn.take() {
                db.coordinator.rollback(&mut txn, &db.locks, "statement failed");
            }
        }
        outcome
    }

    fn end(&mut self, commit: bool) -> Result<()> {
        let Some(mut txn) = self.txn.take() else {
            return Ok(());
        };
        self.db.config.latency.pay();
        let db = &*self.db;
        if commit {
            db.coordinator
                .commit(&mut txn, &db.table, &db.locks, db.events.as_ref())
                .map(|_| ())
        } else {
            db.coordinator.rollback(&mut txn, &db.locks, "rollback");
            Ok(())
        }
    }
}

fn conflict_key(e: &Error) -> CounterKey {
    match e {
        Error::SerializationConflict { key, .. } => *key,
        _ => CounterKey::default(),
    }
}

impl CounterSession for MemorySession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    fn begin(&mut self) -> Result<()> {
        if self.txn.is_some() {
            return Err(Error::invalid_operation(format!(
                "{} already has an open transaction",
                self.id
            )));
        }
        self.statement(|_, _| Ok(()))
    }

    fn read(&mut self, key: CounterKey) -> Result<CounterRow> {
        let id = self.id;
        self.statement(|db, txn| {
            let row = txn.read(&db.table, key)?;
            db.record(id, key, EventKind::Read { counter: row.counter });
            Ok(row)
        })
    }

    fn read_for_update(&mut self, key: CounterKey) -> Result<CounterRow> {
        let id = self.id;
        self.statement(|db, txn| {
            let row = txn.read_for_update(&db.table, &db.locks, key)?;
            db.record(id, key, EventKind::LockedRead { counter: row.counter });
            Ok(row)
        })
    }

    fn write(&mut self, key: CounterKey, counter: i64) -> Result<()> {
        self.statement(|db, txn| txn.write(&db.table, &db.locks, key, counter))
    }

    fn increment(&mut self, key: CounterKey, delta: i64) -> Result<()> {
        self.statement(|db, txn| txn.increment(&db.table, &db.locks, key, delta))
    }

    fn compare_and_write(
        &mut self,
        key: CounterKey,
        expected_version: i64,
        new_counter: i64,
        new_version: i64,
    ) -> Result<bool> {
        let id = self.id;
        self.statement(|db, txn| {
            let applied = txn.compare_and_write(
                &db.table,
                &db.locks,
                key,
                expected_version,
                new_counter,
                new_version,
            )?;
            if !applied {
                trace!(target: "counterbench::txn", %key, expected_version, "compare-and-write rejected");
                db.record(id, key, EventKind::CasRejected);
            }
            Ok(applied)
        })
    }

    fn commit(&mut self) -> Result<()> {
        self.end(true)
    }

    fn rollback(&mut self) -> Result<()> {
        self.end(false)
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Some(mut txn) = self.txn.take() {
            self.db
                .coordinator
                .rollback(&mut txn, &self.db.locks, "session dropped");
        }
    }
}
