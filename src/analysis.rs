//! Statistics derived from a completed ledger
//!
//! - Top-K selection (count desc, avg desc, file_path asc, test_name asc)
//! - Estimated savings: sum of `avg_seconds` over the top-K tests
//! - Two four-bucket distributions: by count relative to the maximum count,
//!   and by absolute average duration
//!
//! Bucket edges, highest bucket first:
//!
//! | bucket  | count share `c / max`  | avg seconds        |
//! |---------|------------------------|--------------------|
//! | top     | `> 0.75`               | `> 0.2`            |
//! | upper   | `[0.50, 0.75]`         | `[0.1, 0.2]`       |
//! | lower   | `[0.25, 0.50)`         | `[0.05, 0.1)`      |
//! | bottom  | `< 0.25`               | `< 0.05`           |

use crate::ledger::{LedgerEntry, Snapshot, TestIdentity};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Average-duration thresholds in seconds, highest first
pub const DURATION_THRESHOLDS: [f64; 3] = [0.2, 0.1, 0.05];

/// Sentence appended wherever the savings figure is shown
pub const SAVINGS_DISCLAIMER: &str =
    "This is an estimate from average durations, not a measured guarantee.";

/// One test's aggregate statistics, flattened for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub file_path: String,
    pub test_name: String,
    pub count: u64,
    pub avg_seconds: f64,
    pub min_seconds: f64,
    pub max_seconds: f64,
}

impl TestSummary {
    pub fn from_entry(identity: &TestIdentity, entry: &LedgerEntry) -> Self {
        Self {
            file_path: identity.file_path.clone(),
            test_name: identity.test_name.clone(),
            count: entry.count,
            avg_seconds: entry.avg_seconds(),
            min_seconds: entry.min_seconds,
            max_seconds: entry.max_seconds,
        }
    }
}

/// Which view a distribution buckets on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    /// Occurrence count as a share of the highest count
    CountPercentile,
    /// Absolute average duration
    AvgDuration,
}

impl DistributionKind {
    /// Column the distribution is keyed on, as shown in reports
    pub fn key(&self) -> &'static str {
        match self {
            DistributionKind::CountPercentile => "count",
            DistributionKind::AvgDuration => "avg_s",
        }
    }

    /// Bucket labels, highest range first
    pub fn labels(&self) -> [&'static str; 4] {
        match self {
            DistributionKind::CountPercentile => [">75%", "50–75%", "25–50%", "<25%"],
            DistributionKind::AvgDuration => [">0.2", "0.1–0.2", "0.05–0.1", "<0.05"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub range: String,
    pub number_of_tests: usize,
    pub total_avg_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub kind: DistributionKind,
    /// Always four buckets, highest range first
    pub buckets: Vec<DistributionBucket>,
}

impl Distribution {
    fn empty(kind: DistributionKind) -> Self {
        let buckets = kind
            .labels()
            .iter()
            .map(|label| DistributionBucket {
                range: (*label).to_string(),
                number_of_tests: 0,
                total_avg_time_seconds: 0.0,
            })
            .collect();
        Self { kind, buckets }
    }

    fn add(&mut self, bucket: usize, avg_seconds: f64) {
        let b = &mut self.buckets[bucket];
        b.number_of_tests += 1;
        b.total_avg_time_seconds += avg_seconds;
    }

    pub fn total_tests(&self) -> usize {
        self.buckets.iter().map(|b| b.number_of_tests).sum()
    }
}

/// Everything the emitter needs besides the ledger itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub top_k: usize,
    /// Selected tests in ranking order (fewer than `top_k` if the ledger is small)
    pub top_tests: Vec<TestSummary>,
    pub estimated_savings_seconds: f64,
    pub total_tests: usize,
    pub max_count: u64,
    pub count_distribution: Distribution,
    pub duration_distribution: Distribution,
}

/// Ranking used for top-K selection and for ordered full listings
pub fn compare_summaries(a: &TestSummary, b: &TestSummary) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.avg_seconds.total_cmp(&a.avg_seconds))
        .then_with(|| a.file_path.cmp(&b.file_path))
        .then_with(|| a.test_name.cmp(&b.test_name))
}

/// All ledger entries, in ranking order
pub fn ranked(snapshot: &Snapshot) -> Vec<TestSummary> {
    let mut all: Vec<TestSummary> = snapshot
        .iter()
        .map(|(identity, entry)| TestSummary::from_entry(identity, entry))
        .collect();
    all.sort_by(compare_summaries);
    all
}

/// Bucket index for a count relative to the maximum count
///
/// Integer arithmetic keeps the 25/50/75% edges exact.
pub fn count_bucket(count: u64, max_count: u64) -> usize {
    let scaled = u128::from(count) * 4;
    let max = u128::from(max_count.max(1));
    if scaled > 3 * max {
        0
    } else if scaled >= 2 * max {
        1
    } else if scaled >= max {
        2
    } else {
        3
    }
}

/// Bucket index for an average duration in seconds
pub fn duration_bucket(avg_seconds: f64) -> usize {
    let [high, mid, low] = DURATION_THRESHOLDS;
    if avg_seconds > high {
        0
    } else if avg_seconds >= mid {
        1
    } else if avg_seconds >= low {
        2
    } else {
        3
    }
}

/// Derive top-K, savings and both distributions from a ledger snapshot
pub fn compute(snapshot: &Snapshot, top_k: usize) -> AnalysisResult {
    let all = ranked(snapshot);
    let max_count = all.iter().map(|t| t.count).max().unwrap_or(0);

    let mut count_distribution = Distribution::empty(DistributionKind::CountPercentile);
    let mut duration_distribution = Distribution::empty(DistributionKind::AvgDuration);
    for test in &all {
        count_distribution.add(count_bucket(test.count, max_count), test.avg_seconds);
        duration_distribution.add(duration_bucket(test.avg_seconds), test.avg_seconds);
    }

    let top_tests: Vec<TestSummary> = all.into_iter().take(top_k).collect();
    let estimated_savings_seconds: f64 = top_tests.iter().map(|t| t.avg_seconds).sum();

    tracing::debug!(
        total_tests = snapshot.len(),
        max_count,
        selected = top_tests.len(),
        "computed analysis"
    );

    AnalysisResult {
        top_k,
        top_tests,
        estimated_savings_seconds,
        total_tests: snapshot.len(),
        max_count,
        count_distribution,
        duration_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Ledger, Observation};

    fn ledger_with(entries: &[(&str, &str, u64, f64)]) -> Ledger {
        let mut ledger = Ledger::new();
        let max_count = entries.iter().map(|e| e.2).max().unwrap_or(0);
        for run in 0..max_count {
            let observations = entries
                .iter()
                .filter(|(_, _, count, _)| run < *count)
                .map(|(path, name, _, avg)| {
                    Observation::new(TestIdentity::new(*path, *name), *avg)
                })
                .collect::<Vec<_>>();
            ledger.ingest(observations);
        }
        ledger
    }

    #[test]
    fn test_top_k_scenario() {
        let ledger = ledger_with(&[
            ("test/a_test.exs:1", "A", 95, 0.36),
            ("test/b_test.exs:2", "B", 82, 0.12),
            ("test/c_test.exs:3", "C", 3, 0.50),
        ]);
        let result = compute(ledger.snapshot(), 2);

        let names: Vec<_> = result.top_tests.iter().map(|t| t.test_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!((result.estimated_savings_seconds - 0.48).abs() < 1e-9);
        assert_eq!(result.max_count, 95);
    }

    #[test]
    fn test_tie_break_by_avg_then_path() {
        let ledger = ledger_with(&[
            ("z.exs:1", "slow", 2, 0.3),
            ("b.exs:1", "fast", 2, 0.1),
            ("a.exs:1", "fast", 2, 0.1),
        ]);
        let result = compute(ledger.snapshot(), 3);
        let paths: Vec<_> = result.top_tests.iter().map(|t| t.file_path.as_str()).collect();
        assert_eq!(paths, vec!["z.exs:1", "a.exs:1", "b.exs:1"]);
    }

    #[test]
    fn test_top_k_larger_than_ledger() {
        let ledger = ledger_with(&[("a.exs:1", "a", 1, 0.1)]);
        let result = compute(ledger.snapshot(), 10);
        assert_eq!(result.top_tests.len(), 1);
        assert_eq!(result.top_k, 10);
    }

    #[test]
    fn test_count_bucket_edges() {
        assert_eq!(count_bucket(80, 95), 0);
        assert_eq!(count_bucket(24, 95), 2);
        assert_eq!(count_bucket(23, 95), 3);
        assert_eq!(count_bucket(95, 95), 0);
        // Exact edges belong to the bucket listed as inclusive
        assert_eq!(count_bucket(75, 100), 1);
        assert_eq!(count_bucket(76, 100), 0);
        assert_eq!(count_bucket(50, 100), 1);
        assert_eq!(count_bucket(49, 100), 2);
        assert_eq!(count_bucket(25, 100), 2);
        assert_eq!(count_bucket(24, 100), 3);
    }

    #[test]
    fn test_duration_bucket_edges() {
        assert_eq!(duration_bucket(0.36), 0);
        assert_eq!(duration_bucket(0.2), 1);
        assert_eq!(duration_bucket(0.1), 1);
        assert_eq!(duration_bucket(0.099), 2);
        assert_eq!(duration_bucket(0.05), 2);
        assert_eq!(duration_bucket(0.049), 3);
        assert_eq!(duration_bucket(0.0), 3);
    }

    #[test]
    fn test_distributions_cover_every_test() {
        let ledger = ledger_with(&[
            ("a.exs:1", "a", 10, 0.3),
            ("b.exs:1", "b", 6, 0.15),
            ("c.exs:1", "c", 3, 0.07),
            ("d.exs:1", "d", 1, 0.01),
        ]);
        let result = compute(ledger.snapshot(), 2);

        let counts: Vec<_> = result
            .count_distribution
            .buckets
            .iter()
            .map(|b| b.number_of_tests)
            .collect();
        assert_eq!(counts, vec![1, 1, 1, 1]);
        assert_eq!(result.duration_distribution.total_tests(), 4);
        assert!(
            (result.duration_distribution.buckets[0].total_avg_time_seconds - 0.3).abs() < 1e-9
        );
    }

    #[test]
    fn test_empty_ledger_is_all_zero() {
        let ledger = Ledger::new();
        let result = compute(ledger.snapshot(), 5);
        assert!(result.top_tests.is_empty());
        assert_eq!(result.estimated_savings_seconds, 0.0);
        assert_eq!(result.total_tests, 0);
        for dist in [&result.count_distribution, &result.duration_distribution] {
            assert_eq!(dist.buckets.len(), 4);
            assert!(dist
                .buckets
                .iter()
                .all(|b| b.number_of_tests == 0 && b.total_avg_time_seconds == 0.0));
        }
    }

    #[test]
    fn test_bucket_labels_in_order() {
        let ledger = Ledger::new();
        let result = compute(ledger.snapshot(), 1);
        let ranges: Vec<_> = result
            .count_distribution
            .buckets
            .iter()
            .map(|b| b.range.as_str())
            .collect();
        assert_eq!(ranges, vec![">75%", "50–75%", "25–50%", "<25%"]);
    }
}
