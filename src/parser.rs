//! Slowest-tests report parser
//!
//! Turns one run's raw console output into [`Observation`]s. Only the
//! "Top N slowest" section is read; everything around it (compile output,
//! assertion failures, seeds) is ignored.
//!
//! # Report format, version 1
//!
//! A section starts at any line beginning with `Top <n> slowest`
//! (case-insensitive) and ends at the first blank line that follows a
//! non-blank section line, or at the next header. Two entry shapes are
//! recognised inside a section:
//!
//! ```text
//! 0.36s test/app/user_test.exs:42 creates a user with valid attrs
//! * test creates a user (360.2ms) (App.UserTest) [test/app/user_test.exs:42]
//! ```
//!
//! Durations default to seconds; an `ms` suffix is divided by 1000. Test
//! names truncated by the runner (`...` or `…`) are kept verbatim. Lines in a
//! section that match neither shape become [`ParseWarning`]s.

use crate::ledger::{Observation, TestIdentity};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Version of the text contract described in the module docs
pub const REPORT_FORMAT_VERSION: u32 = 1;

/// A line inside a report section that could not be read
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    /// 1-based line number within the raw output
    pub line_number: usize,
    pub line: String,
    pub reason: &'static str,
}

/// Result of parsing one run's output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReport {
    pub observations: Vec<Observation>,
    pub warnings: Vec<ParseWarning>,
    /// Whether a slowest-tests header was seen at all
    pub section_found: bool,
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*top\s+\d+\s+slowest\b").expect("valid header regex"))
}

fn columnar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?P<dur>\d+(?:\.\d+)?)\s*(?P<unit>ms|s)?\s+(?P<path>\S+:\d+)\s+(?P<name>.*\S)\s*$",
        )
        .expect("valid columnar regex")
    })
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*\*\s+test\s+(?P<name>.+?)\s+\((?P<dur>\d+(?:\.\d+)?)\s*(?P<unit>ms|s)?\)\s+\((?P<module>[^)]+)\)\s+\[(?P<path>[^\]]+:\d+)\]\s*$",
        )
        .expect("valid bullet regex")
    })
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ansi regex"))
}

/// Parse every slowest-tests section in `raw` as a single run
pub fn parse(raw: &str) -> ParsedReport {
    let mut report = ParsedReport::default();
    for section in sections(raw) {
        report.section_found = true;
        section.parse_into(&mut report);
    }
    report
}

/// Split a log holding many runs into one report per section
///
/// Used when replaying a previously captured log instead of invoking the
/// test command.
pub fn split_runs(raw: &str) -> Vec<ParsedReport> {
    sections(raw)
        .into_iter()
        .map(|section| {
            let mut report = ParsedReport {
                section_found: true,
                ..ParsedReport::default()
            };
            section.parse_into(&mut report);
            report
        })
        .collect()
}

/// Parse a single entry line, without section context
pub fn parse_line(line: &str) -> Option<Observation> {
    let clean = strip_ansi(line);
    if let Some(caps) = columnar_re().captures(&clean) {
        let duration = duration_seconds(&caps)?;
        let identity = TestIdentity::new(&caps["path"], &caps["name"]);
        return Some(Observation::new(identity, duration));
    }
    if let Some(caps) = bullet_re().captures(&clean) {
        let duration = duration_seconds(&caps)?;
        let name = format!("{} ({})", &caps["name"], &caps["module"]);
        let identity = TestIdentity::new(&caps["path"], name);
        return Some(Observation::new(identity, duration));
    }
    None
}

fn duration_seconds(caps: &Captures<'_>) -> Option<f64> {
    let value: f64 = caps["dur"].parse().ok()?;
    match caps.name("unit").map(|m| m.as_str()) {
        Some("ms") => Some(value / 1000.0),
        _ => Some(value),
    }
}

fn strip_ansi(line: &str) -> std::borrow::Cow<'_, str> {
    ansi_re().replace_all(line, "")
}

struct Section<'a> {
    lines: Vec<(usize, &'a str)>,
}

impl Section<'_> {
    fn parse_into(&self, report: &mut ParsedReport) {
        for &(line_number, line) in &self.lines {
            match parse_line(line) {
                Some(obs) => report.observations.push(obs),
                None => report.warnings.push(ParseWarning {
                    line_number,
                    line: line.to_string(),
                    reason: "line does not match a slowest-test entry",
                }),
            }
        }
    }
}

fn sections(raw: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current: Option<Section<'_>> = None;

    for (idx, line) in raw.lines().enumerate() {
        let clean = strip_ansi(line);
        if header_re().is_match(&clean) {
            if let Some(done) = current.take() {
                sections.push(done);
            }
            current = Some(Section { lines: Vec::new() });
            continue;
        }

        let Some(section) = current.as_mut() else {
            continue;
        };

        if clean.trim().is_empty() {
            // Blank lines between the header and the first entry are padding
            if !section.lines.is_empty() {
                if let Some(done) = current.take() {
                    sections.push(done);
                }
            }
            continue;
        }

        section.lines.push((idx + 1, line));
    }

    if let Some(done) = current {
        sections.push(done);
    }
    sections
}
