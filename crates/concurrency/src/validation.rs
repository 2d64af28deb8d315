//! Transaction validation
//!
//! Conflict detection for serializable transactions:
//! - First committer wins, based on the READ set
//! - A row read at commit stamp S conflicts if its current stamp is not S
//! - Read-committed transactions are never validated: they accept whatever
//!   interleaving happened, which is how lost updates arise

use crate::transaction::TransactionContext;
use counterbench_core::CounterKey;
use counterbench_storage::RowTable;
use rustc_hash::FxHashMap;

/// Types of conflicts that can occur during transaction validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// Row was read at one commit stamp but has a different one now
    ReadWriteConflict {
        /// The row that has a conflict
        key: CounterKey,
        /// Commit stamp recorded when read
        read_seq: u64,
        /// Commit stamp at validation time
        current_seq: u64,
    },
}

impl ConflictType {
    /// Row the conflict was detected on
    pub fn key(&self) -> CounterKey {
        match self {
            ConflictType::ReadWriteConflict { key, .. } => *key,
        }
    }
}

/// Result of transaction validation
///
/// A transaction commits only if is_valid() returns true.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Create a successful validation result (no conflicts)
    pub fn ok() -> Self {
        ValidationResult {
            conflicts: Vec::new(),
        }
    }

    /// Create a validation result with a single conflict
    pub fn conflict(conflict: ConflictType) -> Self {
        ValidationResult {
            conflicts: vec![conflict],
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// Row of the first conflict, if any
    pub fn first_key(&self) -> Option<CounterKey> {
        self.conflicts.first().map(ConflictType::key)
    }
}

/// Validate the read set against the committed table
///
/// A row that no longer exists has stamp 0 and therefore conflicts.
pub fn validate_read_set(read_set: &FxHashMap<CounterKey, u64>, table: &RowTable) -> ValidationResult {
    let mut result = ValidationResult::ok();

    for (key, read_seq) in read_set {
        let current_seq = table.commit_seq(key);
        if current_seq != *read_seq {
            result.conflicts.push(ConflictType::ReadWriteConflict {
                key: *key,
                read_seq: *read_seq,
                current_seq,
            });
        }
    }

    result
}

/// Validate a transaction for commit
///
/// Must be called with the commit lock held so the table cannot change
/// between validation and apply.
pub fn validate_transaction(txn: &TransactionContext, table: &RowTable) -> ValidationResult {
    if !txn.isolation.is_serializable() {
        return ValidationResult::ok();
    }
    validate_read_set(&txn.read_set, table)
}
