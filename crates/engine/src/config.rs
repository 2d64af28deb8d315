//! Benchmark configuration via `counterbench.toml`
//!
//! Every field has a default, so an empty file (or no file) runs the
//! standard benchmark: ten workers, ten thousand increments each, all five
//! strategies against the in-memory database.

use crate::database::{CounterDatabase, DatabaseConfig, StatementLatency};
use crate::driver::Workload;
use crate::strategy::{RetryPolicy, StrategyKind};
use counterbench_core::{CounterKey, CounterStore, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "counterbench.toml";

/// Where the counter lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// `"memory"` (default) or `"sqlite"`
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Statement latency of the memory backend: `"none"`, `"yield"` or `"sleep"`
    #[serde(default = "default_latency")]
    pub latency: String,
    /// Sleep per statement in microseconds when `latency = "sleep"`
    #[serde(default = "default_latency_us")]
    pub latency_us: u64,
    /// Record an event log in the memory backend
    #[serde(default)]
    pub record_events: bool,
    /// Database file of the sqlite backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,
    /// How long a sqlite statement waits on a locked database, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_latency() -> String {
    "yield".to_string()
}

fn default_latency_us() -> u64 {
    50
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            latency: default_latency(),
            latency_us: default_latency_us(),
            record_events: false,
            sqlite_path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Parse the latency string into a [`StatementLatency`]
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"none"`, `"yield"` or `"sleep"`.
    pub fn statement_latency(&self) -> Result<StatementLatency> {
        match self.latency.as_str() {
            "none" => Ok(StatementLatency::None),
            "yield" => Ok(StatementLatency::Yield),
            "sleep" => Ok(StatementLatency::Sleep(Duration::from_micros(self.latency_us))),
            other => Err(Error::InvalidConfig(format!(
                "Invalid latency '{}' in {}. Expected \"none\", \"yield\" or \"sleep\".",
                other, CONFIG_FILE_NAME
            ))),
        }
    }

    /// Configuration for the memory backend
    pub fn database_config(&self) -> Result<DatabaseConfig> {
        Ok(DatabaseConfig::new()
            .with_latency(self.statement_latency()?)
            .with_events(self.record_events))
    }
}

/// Benchmark configuration loaded from `counterbench.toml`.
///
/// # Example
///
/// ```toml
/// workers = 10
/// iterations = 10000
/// strategies = ["lost-update", "optimistic"]
///
/// [retry]
/// max_retries = 1000
///
/// [store]
/// backend = "memory"
/// latency = "yield"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchConfig {
    /// Concurrent workers per strategy
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Increments per worker
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// `user_id` of the counter row
    #[serde(default = "default_key")]
    pub key: i64,
    /// Strategies to run, in order
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,
    /// Conflict retry policy
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Backend selection
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_workers() -> usize {
    10
}

fn default_iterations() -> u64 {
    10_000
}

fn default_key() -> i64 {
    CounterKey::DEFAULT.user_id()
}

fn default_strategies() -> Vec<StrategyKind> {
    StrategyKind::ALL.to_vec()
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            iterations: default_iterations(),
            key: default_key(),
            strategies: default_strategies(),
            retry: RetryPolicy::default(),
            store: StoreConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# counterbench configuration

# Concurrent workers per strategy (default: 10)
workers = 10

# Successful increments per worker (default: 10000)
iterations = 10000

# user_id of the counter row (default: 1)
key = 1

# Strategies to run, in order (default: all five)
#   "lost-update", "serializable", "in-place", "row-locking", "optimistic"
strategies = ["lost-update", "serializable", "in-place", "row-locking", "optimistic"]

# Retry policy for "serializable" and "optimistic".
# Without max_retries a worker retries until it succeeds.
[retry]
# max_retries = 1000
base_delay_ms = 0
max_delay_ms = 0

[store]
# "memory" (default) or "sqlite" (requires the "sqlite" feature)
backend = "memory"

# Simulated statement round trip for the memory backend:
#   "none", "yield" (default) or "sleep" (latency_us per statement)
latency = "yield"
latency_us = 50

# Record an event log of reads and commits (memory backend only)
record_events = false

# sqlite_path = "counterbench.db"
busy_timeout_ms = 5000
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BenchConfig = toml::from_str(&content).map_err(|e| {
            Error::ConfigParse(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigParse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the benchmark cannot run with
    pub fn validate(&self) -> Result<()> {
        self.workload()?;
        if self.strategies.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one strategy must be selected".to_string(),
            ));
        }
        match self.store.backend.as_str() {
            "memory" => {
                self.store.statement_latency()?;
            }
            "sqlite" => {}
            other => {
                return Err(Error::InvalidConfig(format!(
                    "Invalid backend '{}' in {}. Expected \"memory\" or \"sqlite\".",
                    other, CONFIG_FILE_NAME
                )))
            }
        }
        Ok(())
    }

    /// The workload described by this config
    pub fn workload(&self) -> Result<Workload> {
        Ok(Workload::new(self.workers, self.iterations)?.with_key(CounterKey::new(self.key)))
    }

    /// Open the configured store
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for an unknown backend, or for `"sqlite"` when the
    /// crate was built without the `sqlite` feature.
    pub fn open_store(&self) -> Result<Arc<dyn CounterStore>> {
        match self.store.backend.as_str() {
            "memory" => Ok(Arc::new(CounterDatabase::new(self.store.database_config()?))),
            "sqlite" => self.open_sqlite(),
            other => Err(Error::InvalidConfig(format!(
                "Invalid backend '{}'",
                other
            ))),
        }
    }

    #[cfg(feature = "sqlite")]
    fn open_sqlite(&self) -> Result<Arc<dyn CounterStore>> {
        use crate::sqlite::{SqliteConfig, SqliteCounterStore};

        let path = self
            .store
            .sqlite_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("counterbench.db"));
        let config = SqliteConfig {
            busy_timeout: Duration::from_millis(self.store.busy_timeout_ms),
        };
        Ok(Arc::new(SqliteCounterStore::open(path, config)?))
    }

    #[cfg(not(feature = "sqlite"))]
    fn open_sqlite(&self) -> Result<Arc<dyn CounterStore>> {
        Err(Error::InvalidConfig(
            "backend \"sqlite\" requires counterbench to be built with the \"sqlite\" feature"
                .to_string(),
        ))
    }
}
