//! Concurrency layer for counterbench
//!
//! This crate implements the transaction semantics of the in-memory counter
//! database:
//! - TransactionContext: read set, buffered write set, held row locks
//! - Read-set validation for serializable transactions (first committer wins)
//! - TransactionManager: commit stamps and the atomic validate-and-apply step

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;
pub mod validation;

pub use manager::TransactionManager;
pub use transaction::{CommitError, TransactionContext, TransactionStatus};
pub use validation::{validate_read_set, validate_transaction, ConflictType, ValidationResult};
