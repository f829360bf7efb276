//! JSON artifacts
//!
//! Per-test record lists (full detail and top-K) keep full floating point
//! precision and can be read back with [`parse_records`]. The session
//! envelope carries a format identifier and crate version like every other
//! versioned artifact.

use crate::analysis::{AnalysisResult, Distribution, TestSummary, SAVINGS_DISCLAIMER};
use crate::parser::REPORT_FORMAT_VERSION;
use serde::{Deserialize, Serialize};

pub const SESSION_FORMAT: &str = "slowest-tally-session-v1";

/// Render a list of per-test records as pretty JSON
pub fn render_records(tests: &[TestSummary]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(tests)
}

/// Read back a record list written by [`render_records`]
pub fn parse_records(json: &str) -> serde_json::Result<Vec<TestSummary>> {
    serde_json::from_str(json)
}

/// Run bookkeeping included in the session envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunCounts {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Parse warnings across all successful runs
    pub parse_warnings: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRunFailure {
    /// 1-based run number
    pub run: usize,
    pub reason: String,
}

/// Root of `session.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionJson {
    pub format: String,
    pub version: String,
    /// Version of the slowest-tests text format the runs were parsed with
    pub report_format: u32,
    pub runs: RunCounts,
    pub top_k: usize,
    pub estimated_savings_seconds: f64,
    pub estimated_savings_note: String,
    pub total_tests: usize,
    pub max_count: u64,
    pub count_distribution: Distribution,
    pub duration_distribution: Distribution,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<JsonRunFailure>,
}

impl SessionJson {
    pub fn new(result: &AnalysisResult, runs: RunCounts, failures: Vec<JsonRunFailure>) -> Self {
        Self {
            format: SESSION_FORMAT.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            report_format: REPORT_FORMAT_VERSION,
            runs,
            top_k: result.top_k,
            estimated_savings_seconds: result.estimated_savings_seconds,
            estimated_savings_note: SAVINGS_DISCLAIMER.to_string(),
            total_tests: result.total_tests,
            max_count: result.max_count,
            count_distribution: result.count_distribution.clone(),
            duration_distribution: result.duration_distribution.clone(),
            failures,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
