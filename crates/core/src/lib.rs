//! Core types and traits for counterbench
//!
//! This crate defines the foundational types used throughout the system:
//! - CounterKey: Identity of the single counter row being exercised
//! - CounterRow: The `(counter, version)` pair stored per key
//! - IsolationLevel: Isolation requested when opening a session
//! - SessionId: Identity of a store session (one per worker)
//! - Error: Error taxonomy (recoverable conflicts vs fatal faults)
//! - Traits: Storage abstraction consumed by the strategies (CounterStore, CounterSession)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{CounterSession, CounterStore};
pub use types::{CounterKey, CounterRow, IsolationLevel, SessionId};
