//! Storage layer for counterbench
//!
//! This crate holds the raw in-memory structures behind the counter database:
//! - RowTable: committed counter rows (DashMap, lock-free reads)
//! - StoredRow: a committed row plus the commit stamp that produced it
//! - RowLockTable: exclusive per-row locks owned by sessions
//! - EventLog: optional ordered record of store operations, used to audit
//!   lock ordering in tests
//!
//! Transaction semantics (buffering, validation, commit) live one layer up in
//! `counterbench-concurrency`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod events;
pub mod locks;
pub mod stored_row;
pub mod table;

pub use events::{EventKind, EventLog, StoreEvent};
pub use locks::{LockAcquisition, RowLockTable};
pub use stored_row::StoredRow;
pub use table::RowTable;
