//! CLI argument parsing for slowest-tally

use crate::config::SessionConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "slowest-tally")]
#[command(version)]
#[command(
    about = "Run a test suite's slowest-tests report repeatedly and aggregate the timings",
    long_about = None
)]
pub struct Cli {
    /// Number of test suite runs
    #[arg(short = 'n', long = "runs", value_name = "N")]
    pub runs: Option<usize>,

    /// Slowest tests to request from each run
    #[arg(short = 's', long = "slowest", value_name = "S")]
    pub slowest: Option<usize>,

    /// Number of tests in the top-K summary
    #[arg(short = 'k', long = "top", value_name = "K")]
    pub top_k: Option<usize>,

    /// Directory for report artifacts
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// TOML session configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-run timeout in seconds; a run exceeding it is excluded
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Analyse a captured log of previous runs instead of running tests
    #[arg(long = "from-log", value_name = "FILE")]
    pub from_log: Option<PathBuf>,

    /// Do not print the report to stdout (artifacts are still written)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Log run progress
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Enable trace-level debug logging
    #[arg(long = "debug")]
    pub debug: bool,

    /// Test command (everything after --); `{slowest}` is replaced with S
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// Apply command line overrides on top of a loaded configuration
    pub fn apply(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(runs) = self.runs {
            config.runs = runs;
        }
        if let Some(slowest) = self.slowest {
            config.slowest = slowest;
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = Some(secs);
        }
        if !self.command.is_empty() {
            config.command = self.command.clone();
        }
        config
    }
}
