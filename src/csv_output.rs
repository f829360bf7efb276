//! CSV output for per-test summaries
//!
//! Columns are fixed: `count,avg_s,min_s,max_s,file_path,test_name`, with the
//! three timing columns rounded to two decimals.

use crate::analysis::TestSummary;

pub const CSV_HEADER: &str = "count,avg_s,min_s,max_s,file_path,test_name";

/// CSV summary formatter
#[derive(Debug, Default)]
pub struct CsvSummaryOutput {
    rows: Vec<TestSummary>,
}

impl CsvSummaryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tests(tests: &[TestSummary]) -> Self {
        Self {
            rows: tests.to_vec(),
        }
    }

    pub fn add_test(&mut self, test: TestSummary) {
        self.rows.push(test);
    }

    /// Escape CSV field (handle commas, quotes, line breaks)
    fn escape_field(field: &str) -> String {
        if field.contains([',', '"', '\n', '\r']) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_row(test: &TestSummary) -> String {
        format!(
            "{},{:.2},{:.2},{:.2},{},{}",
            test.count,
            test.avg_seconds,
            test.min_seconds,
            test.max_seconds,
            Self::escape_field(&test.file_path),
            Self::escape_field(&test.test_name)
        )
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(CSV_HEADER);
        output.push('\n');
        for test in &self.rows {
            output.push_str(&Self::format_row(test));
            output.push('\n');
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str) -> TestSummary {
        TestSummary {
            file_path: "test/app/user_test.exs:42".to_string(),
            test_name: name.to_string(),
            count: 95,
            avg_seconds: 0.3649,
            min_seconds: 0.201,
            max_seconds: 1.005,
        }
    }

    #[test]
    fn test_csv_header_only_when_empty() {
        let output = CsvSummaryOutput::new();
        assert_eq!(output.to_csv(), "count,avg_s,min_s,max_s,file_path,test_name\n");
    }

    #[test]
    fn test_csv_row_rounds_timings() {
        let output = CsvSummaryOutput::from_tests(&[summary("creates a user")]);
        let csv = output.to_csv();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, "95,0.36,0.20,1.00,test/app/user_test.exs:42,creates a user");
    }

    #[test]
    fn test_csv_escape_field_with_comma() {
        assert_eq!(
            CsvSummaryOutput::escape_field("hello,world"),
            "\"hello,world\""
        );
    }

    #[test]
    fn test_csv_escape_field_with_quote() {
        assert_eq!(
            CsvSummaryOutput::escape_field("say \"hi\""),
            "\"say \"\"hi\"\"\""
        );
    }

    #[test]
    fn test_csv_escape_field_with_line_breaks() {
        assert_eq!(CsvSummaryOutput::escape_field("a\rb"), "\"a\rb\"");
        assert_eq!(CsvSummaryOutput::escape_field("a\r\nb"), "\"a\r\nb\"");
    }

    #[test]
    fn test_csv_preserves_row_order() {
        let mut output = CsvSummaryOutput::new();
        output.add_test(summary("first"));
        output.add_test(summary("second"));
        let csv = output.to_csv();
        let names: Vec<_> = csv
            .lines()
            .skip(1)
            .map(|l| l.rsplit(',').next().unwrap())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
