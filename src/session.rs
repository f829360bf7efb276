//! Multi-run analysis session
//!
//! A [`Session`] owns the ledger for its whole lifetime: runs are executed
//! strictly one after another, each run's output is parsed and folded in
//! before the next run starts, and [`Session::finish`] consumes the session
//! to produce a [`SessionReport`]. Failed runs are recorded and skipped.

use crate::analysis::{self, AnalysisResult};
use crate::cancel::CancelToken;
use crate::error::{Result, RunError, SessionError};
use crate::executor::RunExecutor;
use crate::json_output::{JsonRunFailure, RunCounts};
use crate::ledger::Ledger;
use crate::parser::{self, ParsedReport};

/// Session parameters supplied by the CLI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    /// Number of runs (N)
    pub runs: usize,
    /// Slowest tests requested per run (S)
    pub slowest: usize,
    /// Size of the top-K summary (K)
    pub top_k: usize,
}

#[derive(Debug)]
pub enum RunStatus {
    Succeeded {
        observations: usize,
        warnings: usize,
    },
    Failed(RunError),
}

/// Outcome of one run, numbered from 1
#[derive(Debug)]
pub struct RunOutcome {
    pub run: usize,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded { .. })
    }
}

pub struct Session {
    params: SessionParams,
    ledger: Ledger,
    outcomes: Vec<RunOutcome>,
    cancel: CancelToken,
}

impl Session {
    pub fn new(params: SessionParams, cancel: CancelToken) -> Self {
        Self {
            params,
            ledger: Ledger::new(),
            outcomes: Vec::new(),
            cancel,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn outcomes(&self) -> &[RunOutcome] {
        &self.outcomes
    }

    /// Execute the configured number of runs in sequence
    ///
    /// Stops early if the cancel token fires; completed runs are kept.
    pub fn run_with<E: RunExecutor + ?Sized>(&mut self, executor: &mut E) {
        for _ in 0..self.params.runs {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    completed = self.outcomes.len(),
                    "session cancelled; skipping remaining runs"
                );
                break;
            }
            let run = self.outcomes.len() + 1;
            tracing::info!(run, of = self.params.runs, "starting run");
            let output = executor.execute_run(self.params.slowest);
            self.record_output(output);
        }
    }

    /// Parse and fold in the output of one run
    pub fn record_output(&mut self, output: std::result::Result<String, RunError>) {
        match output {
            Ok(raw) => {
                let report = parser::parse(&raw);
                if report.section_found {
                    self.record_report(report);
                } else {
                    self.record_failure(RunError::MissingReport);
                }
            }
            Err(err) => self.record_failure(err),
        }
    }

    /// Fold in an already parsed run
    pub fn record_report(&mut self, report: ParsedReport) {
        let run = self.outcomes.len() + 1;
        for warning in &report.warnings {
            tracing::warn!(
                run,
                line_number = warning.line_number,
                line = %warning.line,
                "{}",
                warning.reason
            );
        }
        let observations = report.observations.len();
        let warnings = report.warnings.len();
        self.ledger.ingest(report.observations);
        tracing::info!(run, observations, warnings, "run ingested");
        self.outcomes.push(RunOutcome {
            run,
            status: RunStatus::Succeeded {
                observations,
                warnings,
            },
        });
    }

    fn record_failure(&mut self, err: RunError) {
        let run = self.outcomes.len() + 1;
        tracing::warn!(run, "run failed and is excluded: {}", err);
        self.outcomes.push(RunOutcome {
            run,
            status: RunStatus::Failed(err),
        });
    }

    /// Close the session and compute statistics
    ///
    /// An empty ledger from successful runs is a valid result. No successful
    /// run at all is [`SessionError::AllRunsFailed`].
    pub fn finish(self) -> Result<SessionReport> {
        let cancelled = self.cancel.is_cancelled();
        let succeeded = self.outcomes.iter().filter(|o| o.is_success()).count();

        if succeeded == 0 {
            if cancelled && self.outcomes.iter().all(|o| {
                matches!(o.status, RunStatus::Failed(RunError::Cancelled))
            }) {
                return Err(SessionError::Cancelled);
            }
            let failures = self
                .outcomes
                .iter()
                .filter_map(|o| match &o.status {
                    RunStatus::Failed(err) => Some(format!("run {}: {}", o.run, err)),
                    RunStatus::Succeeded { .. } => None,
                })
                .collect();
            return Err(SessionError::AllRunsFailed {
                attempted: self.outcomes.len(),
                failures,
            });
        }

        let analysis = analysis::compute(self.ledger.snapshot(), self.params.top_k);
        Ok(SessionReport {
            params: self.params,
            ledger: self.ledger,
            analysis,
            outcomes: self.outcomes,
            cancelled,
        })
    }
}

/// Everything produced by a finished session
#[derive(Debug)]
pub struct SessionReport {
    pub params: SessionParams,
    pub ledger: Ledger,
    pub analysis: AnalysisResult,
    pub outcomes: Vec<RunOutcome>,
    pub cancelled: bool,
}

impl SessionReport {
    pub fn run_counts(&self) -> RunCounts {
        let succeeded = self.outcomes.iter().filter(|o| o.is_success()).count();
        let parse_warnings = self
            .outcomes
            .iter()
            .map(|o| match o.status {
                RunStatus::Succeeded { warnings, .. } => warnings,
                RunStatus::Failed(_) => 0,
            })
            .sum();
        RunCounts {
            attempted: self.outcomes.len(),
            succeeded,
            failed: self.outcomes.len() - succeeded,
            parse_warnings,
            cancelled: self.cancelled,
        }
    }

    pub fn failures(&self) -> Vec<JsonRunFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                RunStatus::Failed(err) => Some(JsonRunFailure {
                    run: o.run,
                    reason: err.to_string(),
                }),
                RunStatus::Succeeded { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: SessionParams = SessionParams {
        runs: 3,
        slowest: 5,
        top_k: 2,
    };

    fn report(lines: &[&str]) -> String {
        format!("Top 5 slowest:\n{}\n", lines.join("\n"))
    }

    #[test]
    fn test_runs_are_sequential_and_aggregated() {
        let outputs = vec![
            report(&["0.4s a.exs:1 a", "0.2s b.exs:2 b"]),
            report(&["0.6s a.exs:1 a"]),
            report(&["0.5s a.exs:1 a", "0.1s c.exs:3 c"]),
        ];
        let mut iter = outputs.into_iter();
        let mut requested = Vec::new();
        let mut exec = |slowest: usize| {
            requested.push(slowest);
            Ok::<_, RunError>(iter.next().unwrap())
        };

        let mut session = Session::new(PARAMS, CancelToken::new());
        session.run_with(&mut exec);
        let report = session.finish().unwrap();

        assert_eq!(requested, vec![5, 5, 5]);
        assert_eq!(report.ledger.len(), 3);
        assert_eq!(report.analysis.top_tests[0].test_name, "a");
        assert_eq!(report.analysis.top_tests[0].count, 3);
        assert_eq!(report.run_counts().succeeded, 3);
    }

    #[test]
    fn test_failed_run_does_not_discard_others() {
        let mut n = 0;
        let mut exec = |_: usize| {
            n += 1;
            if n == 2 {
                Err(RunError::NonZeroExit { code: 1 })
            } else {
                Ok(report(&["0.3s a.exs:1 a"]))
            }
        };
        let mut session = Session::new(PARAMS, CancelToken::new());
        session.run_with(&mut exec);
        let report = session.finish().unwrap();

        let counts = report.run_counts();
        assert_eq!(counts.attempted, 3);
        assert_eq!(counts.failed, 1);
        assert_eq!(report.analysis.top_tests[0].count, 2);
        assert_eq!(report.failures()[0].run, 2);
    }

    #[test]
    fn test_output_without_section_is_failed_run() {
        let mut session = Session::new(PARAMS, CancelToken::new());
        session.record_output(Ok("no report here".to_string()));
        assert!(session.ledger().is_empty());
        assert!(matches!(
            session.outcomes()[0].status,
            RunStatus::Failed(RunError::MissingReport)
        ));
    }

    #[test]
    fn test_all_runs_failed_is_distinct_from_empty_ledger() {
        let mut exec = |_: usize| Err::<String, _>(RunError::NonZeroExit { code: 2 });
        let mut session = Session::new(PARAMS, CancelToken::new());
        session.run_with(&mut exec);
        match session.finish() {
            Err(SessionError::AllRunsFailed {
                attempted,
                failures,
            }) => {
                assert_eq!(attempted, 3);
                assert_eq!(failures.len(), 3);
            }
            other => panic!("expected AllRunsFailed, got {other:?}"),
        }

        let mut exec = |_: usize| Ok::<_, RunError>("Top 5 slowest:\n\n".to_string());
        let mut session = Session::new(PARAMS, CancelToken::new());
        session.run_with(&mut exec);
        let report = session.finish().unwrap();
        assert!(report.ledger.is_empty());
        assert_eq!(report.analysis.estimated_savings_seconds, 0.0);
    }

    #[test]
    fn test_cancel_keeps_completed_runs() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let mut exec = move |_: usize| {
            trigger.cancel();
            Ok::<_, RunError>(report(&["0.3s a.exs:1 a"]))
        };
        let mut session = Session::new(PARAMS, cancel);
        session.run_with(&mut exec);
        let report = session.finish().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.run_counts().attempted, 1);
        assert_eq!(report.ledger.len(), 1);
    }

    #[test]
    fn test_cancel_before_any_run() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut exec = |_: usize| Ok::<_, RunError>(String::new());
        let mut session = Session::new(PARAMS, cancel);
        session.run_with(&mut exec);
        assert!(matches!(session.finish(), Err(SessionError::Cancelled)));
    }

    #[test]
    fn test_parse_warnings_counted() {
        let mut session = Session::new(PARAMS, CancelToken::new());
        session.record_output(Ok(report(&["0.3s a.exs:1 a", "garbage"])));
        let report = session.finish().unwrap();
        assert_eq!(report.run_counts().parse_warnings, 1);
    }
}
