//! Exclusive row locks
//!
//! A row lock is owned by a session and held until that session's
//! transaction ends. Any write statement and `SELECT ... FOR UPDATE` style
//! reads acquire it; plain reads never do.
//!
//! # Blocking
//!
//! `acquire` parks the calling thread on a condition variable until the row
//! is free. Re-acquiring a lock the session already holds returns
//! immediately. There is no timeout and no deadlock detection: every
//! transaction in this system touches a single row.

use counterbench_core::{CounterKey, SessionId};
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Outcome of a lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAcquisition {
    /// The lock was newly acquired by the caller
    Acquired {
        /// Whether the caller had to wait for another session to release it
        waited: bool,
    },
    /// The caller already held the lock
    AlreadyHeld,
}

impl LockAcquisition {
    /// Whether this call took ownership of the lock
    pub fn is_new(&self) -> bool {
        matches!(self, LockAcquisition::Acquired { .. })
    }
}

/// Table of exclusive row locks keyed by row
#[derive(Debug, Default)]
pub struct RowLockTable {
    /// Current owner of each locked row
    held: Mutex<FxHashMap<CounterKey, SessionId>>,
    /// Signalled whenever any lock is released
    released: Condvar,
    /// Number of acquisitions that had to wait - uses Relaxed ordering
    waits: AtomicU64,
}

impl RowLockTable {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock on `key` for `owner`, blocking until it is free
    pub fn acquire(&self, key: CounterKey, owner: SessionId) -> LockAcquisition {
        let mut held = self.held.lock();
        let mut waited = false;
        loop {
            match held.get(&key) {
                None => {
                    held.insert(key, owner);
                    if waited {
                        self.waits.fetch_add(1, Ordering::Relaxed);
                    }
                    trace!(target: "counterbench::lock", %key, %owner, waited, "row lock acquired");
                    return LockAcquisition::Acquired { waited };
                }
                Some(current) if *current == owner => return LockAcquisition::AlreadyHeld,
                Some(_) => {
                    waited = true;
                    self.released.wait(&mut held);
                }
            }
        }
    }

    /// Acquire the lock on `key` only if it is free or already ours
    ///
    /// Returns true if `owner` holds the lock after the call.
    pub fn try_acquire(&self, key: CounterKey, owner: SessionId) -> bool {
        let mut held = self.held.lock();
        match held.get(&key) {
            None => {
                held.insert(key, owner);
                true
            }
            Some(current) => *current == owner,
        }
    }

    /// Release the lock on `key` if `owner` holds it
    ///
    /// Returns true if a lock was released.
    pub fn release(&self, key: CounterKey, owner: SessionId) -> bool {
        let mut held = self.held.lock();
        if held.get(&key) == Some(&owner) {
            held.remove(&key);
            drop(held);
            self.released.notify_all();
            trace!(target: "counterbench::lock", %key, %owner, "row lock released");
            true
        } else {
            false
        }
    }

    /// Current owner of the lock on `key`
    pub fn holder(&self, key: &CounterKey) -> Option<SessionId> {
        self.held.lock().get(key).copied()
    }

    /// Number of acquisitions that blocked behind another session
    pub fn wait_count(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }
}
