//! counterbench - concurrency-control strategies for a shared counter
//!
//! Five ways to increment one row from many concurrent workers, run against
//! a transactional store and scored by how many increments survive:
//! Lost-Update, Serializable, In-Place, Row-Locking and Optimistic.
//!
//! # Quick Start
//!
//! ```ignore
//! use counterbench::{Benchmark, CounterDatabase, CounterStore, Workload};
//! use std::sync::Arc;
//!
//! let store: Arc<dyn CounterStore> = Arc::new(CounterDatabase::default());
//! let reports = Benchmark::new(store, Workload::default()).run_all()?;
//! for report in &reports {
//!     println!("{}: {} lost", report.strategy, report.outcome.lost_updates);
//! }
//! ```
//!
//! # Architecture
//!
//! The in-memory store, strategies, driver and evaluator live in
//! `counterbench-engine`; the store contract and error type live in
//! `counterbench-core`. Storage and transaction internals are not exposed.

pub use counterbench_core::{
    CounterKey, CounterRow, CounterSession, CounterStore, Error, IsolationLevel, Result,
    SessionId,
};
pub use counterbench_engine::*;

/// Everything needed to run a benchmark
///
/// ```ignore
/// use counterbench::prelude::*;
/// ```
pub mod prelude {
    pub use counterbench_core::{CounterKey, CounterSession, CounterStore, Error, Result};
    pub use counterbench_engine::{
        BenchConfig, Benchmark, CounterDatabase, DatabaseConfig, IncrementStrategy, Outcome,
        RetryPolicy, StrategyKind, StrategyReport, Workload,
    };
}
