//! Benchmark entry point
//!
//! Runs each requested strategy in turn: reset, concurrent workload,
//! evaluation. Strategies never overlap.

use crate::driver::{RunReport, Workload, WorkloadDriver};
use crate::evaluator::{evaluate, Outcome};
use crate::strategy::{RetryPolicy, StrategyKind};
use counterbench_core::{CounterStore, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Result of one strategy
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    /// Strategy that ran
    pub strategy: StrategyKind,
    /// Correctness and timing
    pub outcome: Outcome,
    /// Increment attempts across workers
    pub attempts: u64,
    /// Conflicts across workers
    pub conflicts: u64,
}

impl StrategyReport {
    fn from_run(run: &RunReport, outcome: Outcome) -> Self {
        Self {
            strategy: run.strategy,
            outcome,
            attempts: run.total_attempts(),
            conflicts: run.total_conflicts(),
        }
    }
}

/// Sequential benchmark of several strategies against one store
pub struct Benchmark {
    store: Arc<dyn CounterStore>,
    driver: WorkloadDriver,
}

impl Benchmark {
    /// Create a benchmark with the default retry policy
    pub fn new(store: Arc<dyn CounterStore>, workload: Workload) -> Self {
        let driver = WorkloadDriver::new(Arc::clone(&store), workload);
        Self { store, driver }
    }

    /// Use `retry` for strategies that retry on conflict
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.driver = self.driver.with_retry(retry);
        self
    }

    /// Run one strategy
    pub fn run_one(&self, kind: StrategyKind) -> Result<StrategyReport> {
        let strategy = kind.strategy();
        let run = self.driver.run(strategy.as_ref())?;
        let workload = self.driver.workload();
        let outcome = evaluate(
            self.store.as_ref(),
            workload.key,
            workload.expected_total(),
            run.duration,
        )?;

        info!(
            target: "counterbench::bench",
            strategy = kind.name(),
            final_counter = outcome.final_counter,
            lost_updates = outcome.lost_updates,
            conflicts = run.total_conflicts(),
            "strategy evaluated"
        );

        Ok(StrategyReport::from_run(&run, outcome))
    }

    /// Run `kinds` in order, stopping at the first failing strategy
    pub fn run(&self, kinds: &[StrategyKind]) -> Result<Vec<StrategyReport>> {
        kinds.iter().map(|kind| self.run_one(*kind)).collect()
    }

    /// Run all five strategies
    pub fn run_all(&self) -> Result<Vec<StrategyReport>> {
        self.run(&StrategyKind::ALL)
    }
}
