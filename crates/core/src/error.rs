//! Error types for counterbench
//!
//! Errors fall into two classes:
//! - **Conflict** (recoverable): a serializable commit lost a race. Strategies
//!   retry these locally and never surface them to the driver.
//! - **Fatal** (everything else): lost connection, missing row, malformed
//!   configuration. These abort the current strategy run.
//!
//! Note that a rejected compare-and-write is not an error at all; it is
//! reported as `Ok(false)`.

use crate::types::CounterKey;
use std::io;
use thiserror::Error;

/// Result type alias for counterbench operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for counterbench
#[derive(Debug, Error)]
pub enum Error {
    /// A serializable transaction was aborted because a concurrent transaction
    /// committed first
    #[error("could not serialize access to {key}: {reason}")]
    SerializationConflict {
        /// Row the conflict was detected on
        key: CounterKey,
        /// Human-readable description of the conflict
        reason: String,
    },

    /// The counter row does not exist (schema or reset missing)
    #[error("counter row not found: {0}")]
    RowNotFound(CounterKey),

    /// Backend failure (connection loss, SQL error, malformed response)
    #[error("backend error: {message}")]
    Backend {
        /// Description of the failure
        message: String,
        /// Underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation not valid in the current session/transaction state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("configuration parse error: {0}")]
    ConfigParse(String),

    /// I/O error (config files, thread spawning)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A bounded retry loop gave up on one logical increment
    #[error("{strategy} worker {worker} gave up after {retries} consecutive conflicts")]
    RetriesExhausted {
        /// Strategy that was retrying
        strategy: String,
        /// Worker that gave up
        worker: usize,
        /// Number of consecutive conflicts observed
        retries: u64,
    },

    /// A worker thread panicked before reporting a result
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// Worker that panicked
        worker: usize,
    },
}

impl Error {
    /// Create a serialization conflict error
    pub fn conflict(key: CounterKey, reason: impl Into<String>) -> Self {
        Error::SerializationConflict {
            key,
            reason: reason.into(),
        }
    }

    /// Create a backend error without an underlying source
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error wrapping an underlying error
    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation(message.into())
    }

    /// Check if this is a serialization conflict.
    ///
    /// Conflicts are the only recoverable errors: retrying the same logical
    /// increment with fresh state may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::SerializationConflict { .. })
    }

    /// Check if this error must abort the current strategy run
    pub fn is_fatal(&self) -> bool {
        !self.is_conflict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_conflict() {
        let err = Error::conflict(CounterKey::DEFAULT, "read set changed");
        let msg = err.to_string();
        assert!(msg.contains("could not serialize access"));
        assert!(msg.contains("user_id=1"));
        assert!(msg.contains("read set changed"));
    }

    #[test]
    fn test_error_display_row_not_found() {
        let err = Error::RowNotFound(CounterKey::new(9));
        assert!(err.to_string().contains("user_id=9"));
    }

    #[test]
    fn test_error_display_backend() {
        let err = Error::backend("connection reset");
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_backend_source_is_preserved() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err = Error::backend_with_source("write failed", io_err);
        let source = std::error::Error::source(&err).expect("source kept");
        assert!(source.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_error_display_retries_exhausted() {
        let err = Error::RetriesExhausted {
            strategy: "OPTIMISTIC CONCURRENCY".to_string(),
            worker: 3,
            retries: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("worker 3"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn test_only_conflicts_are_recoverable() {
        assert!(Error::conflict(CounterKey::DEFAULT, "x").is_conflict());
        assert!(!Error::conflict(CounterKey::DEFAULT, "x").is_fatal());

        assert!(Error::RowNotFound(CounterKey::DEFAULT).is_fatal());
        assert!(Error::backend("down").is_fatal());
        assert!(Error::invalid_operation("nested begin").is_fatal());
        assert!(Error::WorkerPanicked { worker: 0 }.is_fatal());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_pattern_matching() {
        let err = Error::conflict(CounterKey::new(2), "stale");
        match err {
            Error::SerializationConflict { key, reason } => {
                assert_eq!(key, CounterKey::new(2));
                assert_eq!(reason, "stale");
            }
            _ => panic!("Wrong error variant"),
        }
    }
}
