//! Concurrent workload driver
//!
//! Runs one strategy with a fixed pool of OS threads. Each worker opens its
//! own session; the store is the only thing the workers share.

use crate::strategy::{IncrementStrategy, RetryPolicy, StrategyKind, WorkerContext, WorkerStats};
use counterbench_core::{CounterKey, CounterStore, Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Shape of one benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    /// Concurrent workers
    pub worker_count: usize,
    /// Successful increments per worker
    pub iterations_per_worker: u64,
    /// Row being incremented
    pub key: CounterKey,
}

impl Workload {
    /// Create a validated workload on the default row
    pub fn new(worker_count: usize, iterations_per_worker: u64) -> Result<Self> {
        let workload = Self {
            worker_count,
            iterations_per_worker,
            key: CounterKey::DEFAULT,
        };
        workload.validate()?;
        Ok(workload)
    }

    /// Same workload on another row
    pub fn with_key(mut self, key: CounterKey) -> Self {
        self.key = key;
        self
    }

    /// Reject empty workloads and totals that do not fit the counter
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::InvalidConfig(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.iterations_per_worker == 0 {
            return Err(Error::InvalidConfig(
                "iterations_per_worker must be at least 1".to_string(),
            ));
        }
        if self.checked_total().is_none() {
            return Err(Error::InvalidConfig(format!(
                "{} workers x {} iterations overflows the counter",
                self.worker_count, self.iterations_per_worker
            )));
        }
        Ok(())
    }

    /// Increments the run should produce: `worker_count * iterations_per_worker`
    ///
    /// Saturates at `i64::MAX` for workloads that fail [`validate`](Self::validate).
    pub fn expected_total(&self) -> i64 {
        self.checked_total().unwrap_or(i64::MAX)
    }

    fn checked_total(&self) -> Option<i64> {
        let workers = i64::try_from(self.worker_count).ok()?;
        let iterations = i64::try_from(self.iterations_per_worker).ok()?;
        workers.checked_mul(iterations)
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            worker_count: 10,
            iterations_per_worker: 10_000,
            key: CounterKey::DEFAULT,
        }
    }
}

/// Result of running one strategy
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Strategy that ran
    pub strategy: StrategyKind,
    /// Workload it ran
    pub workload: Workload,
    /// Wall-clock time from first dispatch to last completion
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
    /// Per-worker stats, ordered by worker id
    pub workers: Vec<WorkerStats>,
}

impl RunReport {
    /// Sum of successful increments
    pub fn total_successes(&self) -> u64 {
        self.workers.iter().map(|w| w.successes).sum()
    }

    /// Sum of attempts
    pub fn total_attempts(&self) -> u64 {
        self.workers.iter().map(|w| w.attempts).sum()
    }

    /// Sum of conflicts
    pub fn total_conflicts(&self) -> u64 {
        self.workers.iter().map(|w| w.conflicts).sum()
    }
}

pub(crate) fn serialize_secs<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Runs strategies against a store
pub struct WorkloadDriver {
    store: Arc<dyn CounterStore>,
    workload: Workload,
    retry: RetryPolicy,
}

impl WorkloadDriver {
    /// Create a driver with the default (unbounded) retry policy
    pub fn new(store: Arc<dyn CounterStore>, workload: Workload) -> Self {
        Self {
            store,
            workload,
            retry: RetryPolicy::default(),
        }
    }

    /// Use `retry` for strategies that retry on conflict
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The workload this driver runs
    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    /// Reset the counter and run `strategy` with every worker
    ///
    /// Returns once all workers have finished. If any worker failed, the
    /// error of the lowest-numbered failing worker is returned after all
    /// workers were joined.
    pub fn run(&self, strategy: &dyn IncrementStrategy) -> Result<RunReport> {
        self.workload.validate()?;
        let kind = strategy.kind();
        let workload = self.workload;

        self.store.reset(workload.key)?;
        info!(
            target: "counterbench::driver",
            strategy = kind.name(),
            backend = self.store.backend(),
            workers = workload.worker_count,
            iterations = workload.iterations_per_worker,
            "starting run"
        );

        let store: &dyn CounterStore = self.store.as_ref();
        let start = Instant::now();

        let results: Vec<Result<WorkerStats>> = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workload.worker_count);
            for worker_id in 0..workload.worker_count {
                let ctx = WorkerContext {
                    worker_id,
                    key: workload.key,
                    iterations: workload.iterations_per_worker,
                    retry: self.retry.clone(),
                };
                let spawned = thread::Builder::new()
                    .name(format!("counterbench-worker-{}", worker_id))
                    .spawn_scoped(scope, move || -> Result<WorkerStats> {
                        let mut session = store.open_session(strategy.isolation())?;
                        let stats = strategy.run(session.as_mut(), &ctx)?;
                        debug!(
                            target: "counterbench::driver",
                            worker = worker_id,
                            attempts = stats.attempts,
                            conflicts = stats.conflicts,
                            "worker finished"
                        );
                        Ok(stats)
                    });
                handles.push(spawned);
            }

            handles
                .into_iter()
                .enumerate()
                .map(|(worker, spawned)| match spawned {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or(Err(Error::WorkerPanicked { worker })),
                    Err(e) => Err(Error::Io(e)),
                })
                .collect()
        });

        let duration = start.elapsed();
        let workers = results.into_iter().collect::<Result<Vec<_>>>()?;

        info!(
            target: "counterbench::driver",
            strategy = kind.name(),
            duration_secs = duration.as_secs_f64(),
            "run finished"
        );

        Ok(RunReport {
            strategy: kind,
            workload,
            duration,
            workers,
        })
    }
}
