//! SQLite-backed counter store (feature `sqlite`)
//!
//! Maps the session interface onto a real relational store:
//!
//! | Operation | SQL |
//! |---|---|
//! | `read` | `SELECT counter, version FROM user_counter WHERE user_id = ?` |
//! | `read_for_update` | `BEGIN IMMEDIATE` then `SELECT` |
//! | `write` | `UPDATE user_counter SET counter = ? WHERE user_id = ?` |
//! | `increment` | `UPDATE user_counter SET counter = counter + ? WHERE user_id = ?` |
//! | `compare_and_write` | `UPDATE ... WHERE user_id = ? AND version = ?` |
//!
//! SQLite locks the whole database rather than a row, so `BEGIN IMMEDIATE`
//! stands in for `SELECT ... FOR UPDATE`. Serializable sessions open a
//! deferred transaction on their first statement; a busy or locked database
//! inside such a transaction is reported as a serialization conflict.

use counterbench_core::{
    CounterKey, CounterRow, CounterSession, CounterStore, Error, IsolationLevel, Result, SessionId,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS user_counter (
    user_id INTEGER PRIMARY KEY,
    counter INTEGER NOT NULL,
    version INTEGER NOT NULL
)";

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Counter store in a SQLite database file
///
/// Every session opens its own connection to the file.
#[derive(Debug)]
pub struct SqliteCounterStore {
    path: PathBuf,
    config: SqliteConfig,
    next_session: AtomicU64,
}

impl SqliteCounterStore {
    /// Open (or create) the database, enable WAL journaling and create the table
    pub fn open(path: impl AsRef<Path>, config: SqliteConfig) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            config,
            next_session: AtomicU64::new(1),
        };
        let conn = store.connect()?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| Error::backend_with_source("failed to enable WAL journaling", e))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::backend_with_source("failed to create user_counter table", e))?;
        info!(target: "counterbench::txn", path = %store.path.display(), journal_mode = %mode, "Database setup complete");
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(|e| {
            Error::backend_with_source(format!("failed to open {}", self.path.display()), e)
        })?;
        conn.busy_timeout(self.config.busy_timeout)
            .map_err(|e| Error::backend_with_source("failed to set busy timeout", e))?;
        Ok(conn)
    }

    /// Open a session with a concrete type
    pub fn session(&self, isolation: IsolationLevel) -> Result<SqliteSession> {
        let id = SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed));
        Ok(SqliteSession {
            conn: self.connect()?,
            id,
            isolation,
            in_txn: false,
            last_key: CounterKey::DEFAULT,
        })
    }
}

impl CounterStore for SqliteCounterStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn open_session(&self, isolation: IsolationLevel) -> Result<Box<dyn CounterSession>> {
        Ok(Box::new(self.session(isolation)?))
    }

    fn reset(&self, key: CounterKey) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO user_counter (user_id, counter, version) VALUES (?1, 0, 0)
             ON CONFLICT(user_id) DO UPDATE SET counter = 0, version = 0",
            params![key.user_id()],
        )
        .map_err(|e| Error::backend_with_source("failed to reset counter", e))?;
        info!(target: "counterbench::txn", %key, backend = "sqlite", "counter reset");
        Ok(())
    }
}

/// One connection to a [`SqliteCounterStore`]
pub struct SqliteSession {
    conn: Connection,
    id: SessionId,
    isolation: IsolationLevel,
    in_txn: bool,
    /// Row of the most recent statement, blamed when COMMIT fails
    last_key: CounterKey,
}

impl SqliteSession {
    fn exec(&mut self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::backend_with_source(format!("{} failed", sql), e))
    }

    /// Open the implicit transaction of a serializable session
    fn implicit_begin(&mut self) -> Result<()> {
        if self.isolation.is_serializable() && !self.in_txn {
            self.exec("BEGIN DEFERRED")?;
            self.in_txn = true;
        }
        Ok(())
    }

    /// Translate a statement failure, rolling back on any error inside a transaction
    fn fail(&mut self, key: CounterKey, e: rusqlite::Error) -> Error {
        let busy = matches!(
            e.sqlite_error_code(),
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
        );
        let in_serializable_txn = self.in_txn && self.isolation.is_serializable();
        if self.in_txn {
            if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                debug!(target: "counterbench::txn", session = %self.id, error = %rollback_err, "rollback after failure failed");
            }
            self.in_txn = false;
        }
        if busy && in_serializable_txn {
            Error::conflict(key, e.to_string())
        } else {
            Error::backend_with_source(format!("statement on {} failed", key), e)
        }
    }

    fn select(&mut self, key: CounterKey) -> Result<CounterRow> {
        self.last_key = key;
        let found = self
            .conn
            .query_row(
                "SELECT counter, version FROM user_counter WHERE user_id = ?1",
                params![key.user_id()],
                |row| Ok(CounterRow::new(row.get(0)?, row.get(1)?)),
            )
            .optional();
        match found {
            Ok(Some(row)) => Ok(row),
            Ok(None) => Err(Error::RowNotFound(key)),
            Err(e) => Err(self.fail(key, e)),
        }
    }

    fn update(&mut self, key: CounterKey, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<usize> {
        self.last_key = key;
        match self.conn.execute(sql, params) {
            Ok(changed) => Ok(changed),
            Err(e) => Err(self.fail(key, e)),
        }
    }
}

impl CounterSession for SqliteSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_txn {
            return Err(Error::invalid_operation(format!(
                "{} already has an open transaction",
                self.id
            )));
        }
        self.exec("BEGIN DEFERRED")?;
        self.in_txn = true;
        Ok(())
    }

    fn read(&mut self, key: CounterKey) -> Result<CounterRow> {
        self.implicit_begin()?;
        self.select(key)
    }

    fn read_for_update(&mut self, key: CounterKey) -> Result<CounterRow> {
        if !self.in_txn {
            if let Err(e) = self.conn.execute_batch("BEGIN IMMEDIATE") {
                return Err(self.fail(key, e));
            }
            self.in_txn = true;
        }
        self.select(key)
    }

    fn write(&mut self, key: CounterKey, counter: i64) -> Result<()> {
        self.implicit_begin()?;
        let changed = self.update(
            key,
            "UPDATE user_counter SET counter = ?1 WHERE user_id = ?2",
            params![counter, key.user_id()],
        )?;
        if changed == 0 {
            return Err(Error::RowNotFound(key));
        }
        Ok(())
    }

    fn increment(&mut self, key: CounterKey, delta: i64) -> Result<()> {
        self.implicit_begin()?;
        let changed = self.update(
            key,
            "UPDATE user_counter SET counter = counter + ?1 WHERE user_id = ?2",
            params![delta, key.user_id()],
        )?;
        if changed == 0 {
            return Err(Error::RowNotFound(key));
        }
        Ok(())
    }

    fn compare_and_write(
        &mut self,
        key: CounterKey,
        expected_version: i64,
        new_counter: i64,
        new_version: i64,
    ) -> Result<bool> {
        self.implicit_begin()?;
        let changed = self.update(
            key,
            "UPDATE user_counter SET counter = ?1, version = ?2 WHERE user_id = ?3 AND version = ?4",
            params![new_counter, new_version, key.user_id(), expected_version],
        )?;
        Ok(changed == 1)
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_txn {
            return Ok(());
        }
        match self.conn.execute_batch("COMMIT") {
            Ok(()) => {
                self.in_txn = false;
                Ok(())
            }
            Err(e) => {
                let key = self.last_key;
                Err(self.fail(key, e))
            }
        }
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_txn {
            return Ok(());
        }
        self.in_txn = false;
        self.exec("ROLLBACK")
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.in_txn {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
