//! Benchmark Integration Tests
//!
//! End-to-end runs of every strategy through the public facade, plus the
//! deterministic interleavings behind each strategy's outcome.

#[path = "../common/mod.rs"]
mod common;

mod config_runs;
mod end_to_end;
mod interleavings;
mod properties;
#[cfg(feature = "sqlite")]
mod sqlite;
