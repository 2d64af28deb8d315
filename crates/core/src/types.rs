//! Core types for counterbench
//!
//! This module defines the foundational types:
//! - CounterKey: Identity of a counter row (the `user_id` column)
//! - CounterRow: The mutable `(counter, version)` pair of a row
//! - IsolationLevel: Isolation requested for a session
//! - SessionId: Identity of a session, used as the owner of row locks

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a counter row
///
/// The benchmark exercises exactly one row, keyed by [`CounterKey::DEFAULT`],
/// but the store is keyed so that independent runs (for example in tests)
/// can use disjoint rows of the same store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CounterKey(i64);

impl CounterKey {
    /// The key used by the benchmark (`user_id = 1`)
    pub const DEFAULT: CounterKey = CounterKey(1);

    /// Create a key from a raw user id
    pub const fn new(user_id: i64) -> Self {
        Self(user_id)
    }

    /// Raw user id of this key
    pub const fn user_id(&self) -> i64 {
        self.0
    }
}

impl Default for CounterKey {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user_id={}", self.0)
    }
}

/// The mutable state of a counter row
///
/// `version` is only advanced by optimistic writes, which use it as the
/// conflict-detection token. Plain and relative writes leave it untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CounterRow {
    /// Current counter value
    pub counter: i64,
    /// Optimistic concurrency token
    pub version: i64,
}

impl CounterRow {
    /// The state a row is reset to before every run
    pub const ZERO: CounterRow = CounterRow {
        counter: 0,
        version: 0,
    };

    /// Create a row from its column values
    pub const fn new(counter: i64, version: i64) -> Self {
        Self { counter, version }
    }

    /// Same row with `counter` replaced, version unchanged
    pub const fn with_counter(self, counter: i64) -> Self {
        Self {
            counter,
            version: self.version,
        }
    }
}

impl fmt::Display for CounterRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(counter={}, version={})", self.counter, self.version)
    }
}

/// Transaction isolation level requested when opening a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    /// Statements see the latest committed data; no read validation
    #[default]
    ReadCommitted,
    /// Concurrent conflicting transactions fail at commit instead of interleaving
    Serializable,
}

impl IsolationLevel {
    /// Whether reads in this isolation level are validated at commit
    pub fn is_serializable(&self) -> bool {
        matches!(self, IsolationLevel::Serializable)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::ReadCommitted => write!(f, "read committed"),
            IsolationLevel::Serializable => write!(f, "serializable"),
        }
    }
}

/// Identity of a store session
///
/// Each worker owns exactly one session. Row locks are owned by the session
/// that acquired them and are released when its transaction ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    /// Session used by maintenance operations such as `reset`
    pub const SYSTEM: SessionId = SessionId(0);

    /// Create a session id from a raw value
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value of this id
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}
