//! Session configuration
//!
//! Loaded from an optional TOML file, then overridden field by field from the
//! command line.
//!
//! # Example slowest-tally.toml
//!
//! ```toml
//! runs = 50
//! slowest = 20
//! top_k = 10
//! command = ["mix", "test", "--slowest", "{slowest}"]
//! timeout_secs = 600
//! output_dir = "slowest_tests"
//! ```

use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder replaced by the per-run slowest count in `command`
pub const SLOWEST_PLACEHOLDER: &str = "{slowest}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of runs (N)
    pub runs: usize,
    /// Slowest tests requested from each run (S)
    pub slowest: usize,
    /// Size of the top-K summary (K)
    pub top_k: usize,
    /// Test command argv; `{slowest}` is substituted with S
    pub command: Vec<String>,
    /// Optional per-run bound; a run exceeding it is killed and excluded
    pub timeout_secs: Option<u64>,
    pub output_dir: PathBuf,
}

fn default_runs() -> usize {
    100
}

fn default_slowest() -> usize {
    10
}

fn default_top_k() -> usize {
    10
}

fn default_command() -> Vec<String> {
    ["mix", "test", "--slowest", SLOWEST_PLACEHOLDER]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("slowest_tests")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            slowest: default_slowest(),
            top_k: default_top_k(),
            command: default_command(),
            timeout_secs: None,
            output_dir: default_output_dir(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check N, S, K >= 1 and a non-empty command
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (field, value) in [
            ("runs", self.runs),
            ("slowest", self.slowest),
            ("top_k", self.top_k),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.command.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(ConfigError::EmptyCommand);
        }
        if self.top_k > self.slowest {
            tracing::warn!(
                top_k = self.top_k,
                slowest = self.slowest,
                "top_k exceeds the per-run slowest count"
            );
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Command argv for one run with the slowest count filled in
    ///
    /// If no argument carries the placeholder, `--slowest <S>` is appended.
    pub fn command_for(&self, slowest: usize) -> Vec<String> {
        expand_command(&self.command, slowest)
    }
}

/// Substitute `{slowest}` in an argv template, appending `--slowest <S>` when absent
pub fn expand_command(command: &[String], slowest: usize) -> Vec<String> {
    let count = slowest.to_string();
    let mut argv: Vec<String> = command
        .iter()
        .map(|arg| arg.replace(SLOWEST_PLACEHOLDER, &count))
        .collect();
    if !command.iter().any(|a| a.contains(SLOWEST_PLACEHOLDER)) {
        argv.push("--slowest".to_string());
        argv.push(count);
    }
    argv
}
