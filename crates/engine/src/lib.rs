//! Benchmark engine for counterbench
//!
//! This crate orchestrates the lower layers:
//! - CounterDatabase: in-memory transactional counter store
//! - Strategies: the five increment protocols
//! - WorkloadDriver: runs one strategy on a pool of worker threads
//! - evaluate: compares the final counter to the increments performed
//! - Benchmark: runs several strategies in sequence
//! - BenchConfig: `counterbench.toml` configuration
//!
//! With the `sqlite` feature, `SqliteCounterStore` runs the same benchmark
//! against a SQLite database file.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bench;
pub mod config;
pub mod coordinator;
pub mod database;
pub mod driver;
pub mod evaluator;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod strategy;

pub use bench::{Benchmark, StrategyReport};
pub use config::{BenchConfig, StoreConfig, CONFIG_FILE_NAME};
pub use coordinator::{TransactionCoordinator, TransactionMetrics};
pub use database::{CounterDatabase, DatabaseConfig, MemorySession, StatementLatency};
pub use driver::{RunReport, Workload, WorkloadDriver};
pub use evaluator::{evaluate, Outcome};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConfig, SqliteCounterStore, SqliteSession};
pub use strategy::{
    InPlace, IncrementStrategy, LostUpdate, Optimistic, RetryPolicy, RowLocking, Serializable,
    StrategyKind, WorkerContext, WorkerStats,
};
