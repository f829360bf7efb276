//! Human-readable report sections
//!
//! Console table, distribution tables and the savings sentence. Timing
//! values are shown with two decimals.

use crate::analysis::{AnalysisResult, Distribution, TestSummary, SAVINGS_DISCLAIMER};
use std::fmt::Write;

/// Test names longer than this are cut in the console table
const MAX_NAME_WIDTH: usize = 50;

/// One-sentence savings statement
pub fn savings_statement(result: &AnalysisResult) -> String {
    format!(
        "Removing the top {} tests could save an estimated {:.2} seconds per test suite run. {}",
        result.top_tests.len(),
        result.estimated_savings_seconds,
        SAVINGS_DISCLAIMER
    )
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() > MAX_NAME_WIDTH {
        let cut: String = name.chars().take(MAX_NAME_WIDTH).collect();
        format!("{cut}...")
    } else {
        name.to_string()
    }
}

/// Aligned table with columns `count avg_s min_s max_s file_path test_name`
pub fn top_table(tests: &[TestSummary]) -> String {
    let path_width = tests
        .iter()
        .map(|t| t.file_path.chars().count())
        .max()
        .unwrap_or(0)
        .max("file_path".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} {:>6} {:>6} {:>6}  {:<path_width$}  test_name",
        "count", "avg_s", "min_s", "max_s", "file_path"
    );
    for t in tests {
        let _ = writeln!(
            out,
            "{:>5} {:>6.2} {:>6.2} {:>6.2}  {:<path_width$}  {}",
            t.count,
            t.avg_seconds,
            t.min_seconds,
            t.max_seconds,
            t.file_path,
            truncate_name(&t.test_name)
        );
    }
    out
}

/// Distribution table with columns `range number_of_tests total_avg_time_seconds`
pub fn distribution_table(distribution: &Distribution) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Distribution of tests based on '{}':",
        distribution.kind.key()
    );
    let _ = writeln!(
        out,
        "{:<10} {:<20} {:<22}",
        "range", "number_of_tests", "total_avg_time_seconds"
    );
    let _ = writeln!(out, "{}", "-".repeat(54));
    for bucket in &distribution.buckets {
        let _ = writeln!(
            out,
            "{:<10} {:<20} {:<22.2}",
            bucket.range, bucket.number_of_tests, bucket.total_avg_time_seconds
        );
    }
    out
}

/// Both distribution tables, count view first
pub fn distribution_report(result: &AnalysisResult) -> String {
    format!(
        "{}\n{}",
        distribution_table(&result.count_distribution),
        distribution_table(&result.duration_distribution)
    )
}

/// Full console report: savings, top-K table, distributions
pub fn console_report(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", savings_statement(result));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Top {} tests with most appearances ({} distinct tests seen):",
        result.top_k, result.total_tests
    );
    out.push_str(&top_table(&result.top_tests));
    let _ = writeln!(out);
    out.push_str(&distribution_report(result));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compute;
    use crate::ledger::{Ledger, Observation, TestIdentity};

    fn result() -> AnalysisResult {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![
            Observation::new(TestIdentity::new("test/a_test.exs:1", "a"), 0.36),
            Observation::new(TestIdentity::new("test/b_test.exs:22", "b"), 0.12),
        ]);
        compute(ledger.snapshot(), 2)
    }

    #[test]
    fn test_savings_statement_two_decimals() {
        let text = savings_statement(&result());
        assert!(text.contains("0.48 seconds"));
        assert!(text.contains("estimate"));
    }

    #[test]
    fn test_top_table_column_order() {
        let table = top_table(&result().top_tests);
        let header: Vec<_> = table.lines().next().unwrap().split_whitespace().collect();
        assert_eq!(
            header,
            vec!["count", "avg_s", "min_s", "max_s", "file_path", "test_name"]
        );
        let first: Vec<_> = table.lines().nth(1).unwrap().split_whitespace().collect();
        assert_eq!(first, vec!["1", "0.36", "0.36", "0.36", "test/a_test.exs:1", "a"]);
    }

    #[test]
    fn test_long_names_truncated_in_table() {
        let long = "x".repeat(80);
        let tests = vec![TestSummary {
            file_path: "a.exs:1".to_string(),
            test_name: long,
            count: 1,
            avg_seconds: 0.1,
            min_seconds: 0.1,
            max_seconds: 0.1,
        }];
        let table = top_table(&tests);
        assert!(table.contains(&format!("{}...", "x".repeat(50))));
        assert!(!table.contains(&"x".repeat(51)));
    }

    #[test]
    fn test_distribution_rows_highest_first() {
        let text = distribution_table(&result().duration_distribution);
        let ranges: Vec<_> = text
            .lines()
            .skip(3)
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(ranges, vec![">0.2", "0.1–0.2", "0.05–0.1", "<0.05"]);
        assert!(text.lines().nth(3).unwrap().contains("0.36"));
    }

    #[test]
    fn test_console_report_sections() {
        let report = console_report(&result());
        assert!(report.contains("Removing the top 2 tests"));
        assert!(report.contains("Distribution of tests based on 'count'"));
        assert!(report.contains("Distribution of tests based on 'avg_s'"));
    }
}
