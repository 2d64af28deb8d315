//! In-memory database configuration

use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

/// Simulated cost of one statement round trip
///
/// A real database puts a network round trip between a worker's read and its
/// write; that gap is where concurrent workers interleave. The in-memory
/// database has no such gap, so every statement pays this latency first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatementLatency {
    /// Statements execute back to back
    None,
    /// Yield the thread before each statement
    #[default]
    Yield,
    /// Sleep before each statement
    Sleep(Duration),
}

impl StatementLatency {
    /// Pay the latency for one statement
    #[inline]
    pub fn pay(&self) {
        match self {
            StatementLatency::None => {}
            StatementLatency::Yield => thread::yield_now(),
            StatementLatency::Sleep(duration) => thread::sleep(*duration),
        }
    }
}

/// Configuration for [`CounterDatabase`](super::CounterDatabase)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Latency paid by every statement
    pub latency: StatementLatency,
    /// Record reads, commits and conflicts in an event log
    pub record_events: bool,
}

impl DatabaseConfig {
    /// Default configuration: yield per statement, no event log
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statement latency
    pub fn with_latency(mut self, latency: StatementLatency) -> Self {
        self.latency = latency;
        self
    }

    /// Enable or disable the event log
    pub fn with_events(mut self, record_events: bool) -> Self {
        self.record_events = record_events;
        self
    }
}
