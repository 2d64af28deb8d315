//! Ordered log of store events
//!
//! When enabled, the database records the statements that matter for
//! auditing lock behaviour: locked reads, commits and rejected optimistic
//! writes. Entries are sequenced by a single mutex, so the log order is a
//! total order consistent with what each session observed.

use counterbench_core::{CounterKey, SessionId};
use parking_lot::Mutex;
use serde::Serialize;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A plain read returned `counter`
    Read {
        /// Value observed
        counter: i64,
    },
    /// A locking read returned `counter` with the row lock held
    LockedRead {
        /// Value observed
        counter: i64,
    },
    /// A transaction committed a write of the row
    Committed {
        /// Counter after commit
        counter: i64,
        /// Version after commit
        version: i64,
    },
    /// A compare-and-write found a different version and changed nothing
    CasRejected,
    /// A serializable commit failed validation
    Conflict,
    /// The row was reset to zero
    Reset,
}

/// One entry in the event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreEvent {
    /// Position in the log, starting at 0
    pub seq: u64,
    /// Session that caused the event
    pub session: SessionId,
    /// Row concerned
    pub key: CounterKey,
    /// Event payload
    pub kind: EventKind,
}

/// Append-only event log
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<StoreEvent>>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number
    pub fn record(&self, session: SessionId, key: CounterKey, kind: EventKind) -> u64 {
        let mut events = self.events.lock();
        let seq = events.len() as u64;
        events.push(StoreEvent {
            seq,
            session,
            key,
            kind,
        });
        seq
    }

    /// Copy of every event recorded so far, in log order
    pub fn snapshot(&self) -> Vec<StoreEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if no events were recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}
