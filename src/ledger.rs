//! Cross-run aggregation of slowest-test observations
//!
//! The [`Ledger`] is keyed by [`TestIdentity`] and holds one [`LedgerEntry`]
//! per test that appeared in at least one run's slowest list. Entries are
//! created on first sighting, updated on every later sighting and never
//! removed while a session is alive.
//!
//! Durations are summed as integer nanoseconds so that the final ledger does
//! not depend on the order in which runs were ingested.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names one logical test across runs
///
/// `file_path` carries the `:<line>` suffix reported by the test runner.
/// Ordering is by `file_path`, then `test_name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TestIdentity {
    pub file_path: String,
    pub test_name: String,
}

impl TestIdentity {
    pub fn new(file_path: impl Into<String>, test_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            test_name: test_name.into(),
        }
    }
}

/// One appearance of a test in one run's slowest list
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub identity: TestIdentity,
    pub duration_seconds: f64,
}

impl Observation {
    pub fn new(identity: TestIdentity, duration_seconds: f64) -> Self {
        Self {
            identity,
            duration_seconds,
        }
    }
}

/// Aggregate timing for one identity
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Number of runs in which the test appeared
    pub count: u64,
    pub min_seconds: f64,
    pub max_seconds: f64,
    sum_nanos: u128,
}

impl LedgerEntry {
    fn first(duration_seconds: f64) -> Self {
        Self {
            count: 1,
            min_seconds: duration_seconds,
            max_seconds: duration_seconds,
            sum_nanos: to_nanos(duration_seconds),
        }
    }

    fn record(&mut self, duration_seconds: f64) {
        self.count += 1;
        self.sum_nanos += to_nanos(duration_seconds);
        self.min_seconds = self.min_seconds.min(duration_seconds);
        self.max_seconds = self.max_seconds.max(duration_seconds);
    }

    /// Total of all observed durations
    pub fn sum_seconds(&self) -> f64 {
        self.sum_nanos as f64 / NANOS_PER_SECOND
    }

    /// Mean duration, kept within `[min_seconds, max_seconds]`
    pub fn avg_seconds(&self) -> f64 {
        let avg = self.sum_seconds() / self.count as f64;
        avg.clamp(self.min_seconds, self.max_seconds)
    }
}

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

fn to_nanos(seconds: f64) -> u128 {
    (seconds * NANOS_PER_SECOND).round() as u128
}

/// Read-only view handed to the statistics engine and emitter
pub type Snapshot = BTreeMap<TestIdentity, LedgerEntry>;

/// Aggregation state for one analysis session
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Ledger {
    entries: Snapshot,
    runs_ingested: usize,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed run's observations into the ledger
    ///
    /// Observations with a negative or non-finite duration are dropped.
    pub fn ingest<I>(&mut self, observations: I)
    where
        I: IntoIterator<Item = Observation>,
    {
        for obs in observations {
            if !obs.duration_seconds.is_finite() || obs.duration_seconds < 0.0 {
                tracing::warn!(
                    file_path = %obs.identity.file_path,
                    duration = obs.duration_seconds,
                    "dropping observation with invalid duration"
                );
                continue;
            }
            let duration = obs.duration_seconds;
            self.entries
                .entry(obs.identity)
                .and_modify(|entry| entry.record(duration))
                .or_insert_with(|| LedgerEntry::first(duration));
        }
        self.runs_ingested += 1;
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.entries
    }

    pub fn get(&self, identity: &TestIdentity) -> Option<&LedgerEntry> {
        self.entries.get(identity)
    }

    /// Number of runs folded in so far (including runs with zero observations)
    pub fn runs_ingested(&self) -> usize {
        self.runs_ingested
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
