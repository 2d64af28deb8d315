//! Two-session interleavings
//!
//! Each test drives two sessions by hand through the interleaving that
//! decides a strategy's outcome under contention.

use crate::common::*;
use counterbench::{CounterKey, CounterSession, CounterStore, IsolationLevel};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const KEY: CounterKey = CounterKey::DEFAULT;
const BLOCKED: Duration = Duration::from_millis(100);

// ============================================================================
// Lost update
// ============================================================================

#[test]
fn unlocked_read_then_write_loses_one_increment() {
    let db = quiet_db();
    db.reset(KEY).unwrap();
    let mut a = db.session(IsolationLevel::ReadCommitted);
    let mut b = db.session(IsolationLevel::ReadCommitted);

    let ra = a.read(KEY).unwrap();
    a.commit().unwrap();
    let rb = b.read(KEY).unwrap();
    b.commit().unwrap();

    a.write(KEY, ra.counter + 1).unwrap();
    a.commit().unwrap();
    b.write(KEY, rb.counter + 1).unwrap();
    b.commit().unwrap();

    assert_eq!(db.read(KEY).unwrap().counter, 1);
}

// ============================================================================
// Serializable
// ============================================================================

#[test]
fn serializable_first_committer_wins() {
    let db = quiet_db();
    db.reset(KEY).unwrap();
    let mut a = db.session(IsolationLevel::Serializable);
    let mut b = db.session(IsolationLevel::Serializable);

    a.begin().unwrap();
    b.begin().unwrap();
    let ra = a.read(KEY).unwrap();
    let rb = b.read(KEY).unwrap();

    a.write(KEY, ra.counter + 1).unwrap();
    a.commit().unwrap();

    let err = b
        .write(KEY, rb.counter + 1)
        .and_then(|()| b.commit())
        .unwrap_err();
    assert!(err.is_conflict(), "{err}");
    b.rollback().unwrap();

    // The loser retries with a fresh read
    b.begin().unwrap();
    let rb = b.read(KEY).unwrap();
    b.write(KEY, rb.counter + 1).unwrap();
    b.commit().unwrap();

    assert_eq!(db.read(KEY).unwrap().counter, 2);
}

// ============================================================================
// In-place
// ============================================================================

#[test]
fn relative_updates_serialize_on_the_row_lock() {
    let db = quiet_db();
    db.reset(KEY).unwrap();
    let mut a = db.session(IsolationLevel::ReadCommitted);
    let mut b = db.session(IsolationLevel::ReadCommitted);

    a.increment(KEY, 1).unwrap();

    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        b.increment(KEY, 1).unwrap();
        b.commit().unwrap();
        tx.send(()).unwrap();
    });

    assert!(rx.recv_timeout(BLOCKED).is_err(), "second update must wait");
    a.commit().unwrap();
    handle.join().unwrap();

    assert_eq!(db.read(KEY).unwrap().counter, 2);
}

// ============================================================================
// Row locking
// ============================================================================

#[test]
fn locked_read_blocks_until_holder_commits() {
    let db = quiet_db();
    db.reset(KEY).unwrap();
    let mut a = db.session(IsolationLevel::ReadCommitted);
    let mut b = db.session(IsolationLevel::ReadCommitted);

    let ra = a.read_for_update(KEY).unwrap();

    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let rb = b.read_for_update(KEY).unwrap();
        tx.send(rb.counter).unwrap();
        b.write(KEY, rb.counter + 1).unwrap();
        b.commit().unwrap();
    });

    assert!(rx.recv_timeout(BLOCKED).is_err(), "locked read must wait");
    a.write(KEY, ra.counter + 1).unwrap();
    a.commit().unwrap();

    // The waiter sees the committed value, not the one it would have read
    assert_eq!(rx.recv().unwrap(), 1);
    handle.join().unwrap();
    assert_eq!(db.read(KEY).unwrap().counter, 2);
}

#[test]
fn plain_read_does_not_wait_for_row_lock() {
    let db = quiet_db();
    db.reset(KEY).unwrap();
    let mut a = db.session(IsolationLevel::ReadCommitted);
    let mut b = db.session(IsolationLevel::ReadCommitted);

    a.read_for_update(KEY).unwrap();
    a.write(KEY, 7).unwrap();

    // Uncommitted write is invisible
    assert_eq!(b.read(KEY).unwrap().counter, 0);
    b.commit().unwrap();
    a.commit().unwrap();
    assert_eq!(b.read(KEY).unwrap().counter, 7);
}

// ============================================================================
// Optimistic
// ============================================================================

#[test]
fn stale_version_write_is_rejected_and_changes_nothing() {
    let db = quiet_db();
    db.reset(KEY).unwrap();
    let mut a = db.session(IsolationLevel::ReadCommitted);
    let mut b = db.session(IsolationLevel::ReadCommitted);

    let ra = a.read(KEY).unwrap();
    a.commit().unwrap();
    let rb = b.read(KEY).unwrap();
    b.commit().unwrap();

    assert!(a
        .compare_and_write(KEY, ra.version, ra.counter + 1, ra.version + 1)
        .unwrap());
    a.commit().unwrap();

    assert!(!b
        .compare_and_write(KEY, rb.version, rb.counter + 1, rb.version + 1)
        .unwrap());
    b.commit().unwrap();
    let row = db.read(KEY).unwrap();
    assert_eq!((row.counter, row.version), (1, 1));

    // Retry from a fresh read
    let rb = b.read(KEY).unwrap();
    b.commit().unwrap();
    assert!(b
        .compare_and_write(KEY, rb.version, rb.counter + 1, rb.version + 1)
        .unwrap());
    b.commit().unwrap();
    let row = db.read(KEY).unwrap();
    assert_eq!((row.counter, row.version), (2, 2));
}

#[test]
fn compare_and_write_rejects_without_waiting_for_row_lock() {
    let db = quiet_db();
    db.reset(KEY).unwrap();
    let mut a = db.session(IsolationLevel::ReadCommitted);
    let mut b = db.session(IsolationLevel::ReadCommitted);

    let ra = a.read_for_update(KEY).unwrap();

    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        // Stale version, then current version with the lock held elsewhere
        let stale = b.compare_and_write(KEY, 5, 1, 6).unwrap();
        b.commit().unwrap();
        let locked = b.compare_and_write(KEY, 0, 1, 1).unwrap();
        b.commit().unwrap();
        tx.send((stale, locked)).unwrap();
        b
    });

    assert_eq!(rx.recv_timeout(BLOCKED * 5), Ok((false, false)));
    let mut b = handle.join().unwrap();

    a.write(KEY, ra.counter + 1).unwrap();
    a.commit().unwrap();

    let rb = b.read(KEY).unwrap();
    b.commit().unwrap();
    assert!(b
        .compare_and_write(KEY, rb.version, rb.counter + 1, rb.version + 1)
        .unwrap());
    b.commit().unwrap();
    let row = db.read(KEY).unwrap();
    assert_eq!((row.counter, row.version), (2, 1));
}
