//! Committed row table
//!
//! Holds the latest committed state of every counter row.
//!
//! # Design
//!
//! - DashMap: sharded map, reads never block behind unrelated keys
//! - FxHash: fast non-crypto hash for the small integer keys
//! - Latest version only: the benchmark never reads history, so no MVCC
//!   version chains are kept
//!
//! Writers never touch the table directly. Transactions buffer their writes
//! and the transaction manager applies them here at commit, under its commit
//! lock, so the table only ever contains committed data.

use counterbench_core::{CounterKey, CounterRow};
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

use crate::stored_row::StoredRow;

/// Latest committed row per key
#[derive(Debug)]
pub struct RowTable {
    rows: DashMap<CounterKey, StoredRow, BuildHasherDefault<FxHasher>>,
}

impl RowTable {
    /// Create an empty table
    pub fn new() -> Self {
        RowTable {
            rows: DashMap::with_hasher(BuildHasherDefault::default()),
        }
    }

    /// Latest committed row for `key`, if any
    #[inline]
    pub fn get(&self, key: &CounterKey) -> Option<StoredRow> {
        self.rows.get(key).map(|entry| *entry.value())
    }

    /// Commit stamp of the latest committed row for `key`
    ///
    /// Returns 0 if the row does not exist.
    #[inline]
    pub fn commit_seq(&self, key: &CounterKey) -> u64 {
        self.rows
            .get(key)
            .map(|entry| entry.value().commit_seq())
            .unwrap_or(0)
    }

    /// Check whether a row exists for `key`
    pub fn contains(&self, key: &CounterKey) -> bool {
        self.rows.contains_key(key)
    }

    /// Install a committed row
    ///
    /// Must only be called by the commit path with a stamp newer than the
    /// current one.
    pub fn apply(&self, key: CounterKey, row: CounterRow, commit_seq: u64) {
        debug_assert!(
            commit_seq > self.commit_seq(&key),
            "commit stamps must increase per row"
        );
        self.rows.insert(key, StoredRow::new(row, commit_seq));
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for RowTable {
    fn default() -> Self {
        Self::new()
    }
}
