//! Report emitter
//!
//! Writes every artifact for one analysis into an output directory. Each
//! artifact is rendered by its own pure function from the same
//! [`AnalysisResult`]; writing the same inputs twice produces byte-identical
//! files.

use crate::analysis::{ranked, AnalysisResult};
use crate::csv_output::CsvSummaryOutput;
use crate::error::{Result, SessionError};
use crate::json_output::{self, SessionJson};
use crate::ledger::Snapshot;
use crate::session::SessionReport;
use crate::text_output;
use std::fs;
use std::path::{Path, PathBuf};

pub const FULL_ANALYSIS_JSON: &str = "analysis.json";
pub const TOP_TESTS_JSON: &str = "top_tests.json";
pub const TOP_TESTS_CSV: &str = "top_tests.csv";
pub const FULL_SUMMARY_CSV: &str = "full_summary.csv";
pub const DISTRIBUTION_TXT: &str = "distribution.txt";
pub const SAVINGS_TXT: &str = "savings.txt";
pub const SESSION_JSON: &str = "session.json";
pub const REPORT_TXT: &str = "report.txt";

/// One rendered artifact, not yet written
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: &'static str,
    pub contents: String,
}

#[derive(Debug, Clone)]
pub struct ReportEmitter {
    output_dir: PathBuf,
}

impl ReportEmitter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render and write the analysis artifacts; returns the written paths
    pub fn emit(
        &self,
        result: &AnalysisResult,
        snapshot: &Snapshot,
        top_k: usize,
    ) -> Result<Vec<PathBuf>> {
        let artifacts = render_artifacts(result, snapshot, top_k)?;
        self.write_all(&artifacts)
    }

    /// [`Self::emit`] plus the `session.json` envelope
    pub fn emit_session(&self, report: &SessionReport) -> Result<Vec<PathBuf>> {
        let mut written = self.emit(
            &report.analysis,
            report.ledger.snapshot(),
            report.params.top_k,
        )?;
        let session = SessionJson::new(&report.analysis, report.run_counts(), report.failures());
        let contents = session.to_json().map_err(|e| self.json_error(SESSION_JSON, e))?;
        written.extend(self.write_all(&[Artifact {
            file_name: SESSION_JSON,
            contents,
        }])?);
        Ok(written)
    }

    fn write_all(&self, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir).map_err(|source| SessionError::Emit {
            path: self.output_dir.display().to_string(),
            source,
        })?;

        let mut written = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let path = self.output_dir.join(artifact.file_name);
            fs::write(&path, &artifact.contents).map_err(|source| SessionError::Emit {
                path: path.display().to_string(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "wrote artifact");
            written.push(path);
        }
        Ok(written)
    }

    fn json_error(&self, file_name: &str, err: serde_json::Error) -> SessionError {
        SessionError::Emit {
            path: self.output_dir.join(file_name).display().to_string(),
            source: err.into(),
        }
    }
}

/// Render every analysis artifact in memory
///
/// `top_k` caps the top-K listings; the result's own selection is used as-is
/// when it is already shorter.
pub fn render_artifacts(
    result: &AnalysisResult,
    snapshot: &Snapshot,
    top_k: usize,
) -> Result<Vec<Artifact>> {
    let top = &result.top_tests[..result.top_tests.len().min(top_k)];
    let all = ranked(snapshot);

    let to_emit_err = |file_name: &str, err: serde_json::Error| SessionError::Emit {
        path: file_name.to_string(),
        source: err.into(),
    };

    Ok(vec![
        Artifact {
            file_name: FULL_ANALYSIS_JSON,
            contents: json_output::render_records(&all)
                .map_err(|e| to_emit_err(FULL_ANALYSIS_JSON, e))?,
        },
        Artifact {
            file_name: TOP_TESTS_JSON,
            contents: json_output::render_records(top)
                .map_err(|e| to_emit_err(TOP_TESTS_JSON, e))?,
        },
        Artifact {
            file_name: TOP_TESTS_CSV,
            contents: CsvSummaryOutput::from_tests(top).to_csv(),
        },
        Artifact {
            file_name: FULL_SUMMARY_CSV,
            contents: CsvSummaryOutput::from_tests(&all).to_csv(),
        },
        Artifact {
            file_name: DISTRIBUTION_TXT,
            contents: text_output::distribution_report(result),
        },
        Artifact {
            file_name: SAVINGS_TXT,
            contents: format!("{}\n", text_output::savings_statement(result)),
        },
        Artifact {
            file_name: REPORT_TXT,
            contents: text_output::console_report(result),
        },
    ])
}
