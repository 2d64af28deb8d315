//! Storage-layer row wrapper with commit stamp
//!
//! The contract type `CounterRow` only carries the user-visible columns.
//! Serializable validation needs to know *which commit* produced the row a
//! transaction read, so storage keeps a commit stamp next to every row.

use counterbench_core::CounterRow;

/// A committed row and the commit that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredRow {
    /// User-visible columns
    row: CounterRow,
    /// Commit stamp assigned by the transaction manager
    ///
    /// Strictly increasing across commits to the same row.
    commit_seq: u64,
}

impl StoredRow {
    /// Create a stored row
    pub fn new(row: CounterRow, commit_seq: u64) -> Self {
        StoredRow { row, commit_seq }
    }

    /// The user-visible columns
    #[inline]
    pub fn row(&self) -> CounterRow {
        self.row
    }

    /// The commit stamp of this row
    #[inline]
    pub fn commit_seq(&self) -> u64 {
        self.commit_seq
    }
}
