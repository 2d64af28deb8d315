//! Shared test utilities for the integration test suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]

use counterbench::{
    Benchmark, CounterDatabase, CounterStore, DatabaseConfig, StatementLatency, StrategyKind,
    StrategyReport, Workload,
};
use std::sync::Arc;

// ============================================================================
// Stores
// ============================================================================

/// In-memory store with the default yielding latency.
pub fn memory_db() -> Arc<CounterDatabase> {
    Arc::new(CounterDatabase::new(DatabaseConfig::new()))
}

/// In-memory store with no statement latency, for deterministic tests.
pub fn quiet_db() -> Arc<CounterDatabase> {
    Arc::new(CounterDatabase::new(
        DatabaseConfig::new().with_latency(StatementLatency::None),
    ))
}

/// In-memory store that records an event log.
pub fn audited_db() -> Arc<CounterDatabase> {
    Arc::new(CounterDatabase::new(DatabaseConfig::new().with_events(true)))
}

pub fn as_store(db: &Arc<CounterDatabase>) -> Arc<dyn CounterStore> {
    db.clone()
}

// ============================================================================
// Runs
// ============================================================================

/// Run one strategy end to end and return its report.
pub fn run_strategy(
    store: Arc<dyn CounterStore>,
    kind: StrategyKind,
    workers: usize,
    iterations: u64,
) -> StrategyReport {
    let workload = Workload::new(workers, iterations).unwrap();
    Benchmark::new(store, workload).run_one(kind).unwrap()
}
