//! Error types for runs, configuration and whole sessions
//!
//! Single-run failures ([`RunError`]) are recovered by the session: the run is
//! excluded and the next one starts. Only [`SessionError`] aborts a session.

use std::time::Duration;
use thiserror::Error;

/// Why one invocation of the external test command could not be used
#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("test command exited with status {code}")]
    NonZeroExit { code: i32 },

    #[error("test command was terminated by a signal")]
    Terminated,

    #[error("test command timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("run cancelled before the test command finished")]
    Cancelled,

    #[error("output contained no slowest-tests report section")]
    MissingReport,

    #[error("I/O error while capturing test output: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid session parameters
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be >= 1, got {value}")]
    NotPositive { field: &'static str, value: usize },

    #[error("test command is empty")]
    EmptyCommand,

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Fatal session outcomes
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("all {attempted} runs failed; nothing could be measured")]
    AllRunsFailed {
        attempted: usize,
        failures: Vec<String>,
    },

    #[error("session cancelled before any run completed")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write report artifact {path}: {source}")]
    Emit {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_runs_failed_message() {
        let err = SessionError::AllRunsFailed {
            attempted: 3,
            failures: vec!["boom".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "all 3 runs failed; nothing could be measured"
        );
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: SessionError = ConfigError::NotPositive {
            field: "runs",
            value: 0,
        }
        .into();
        assert_eq!(err.to_string(), "runs must be >= 1, got 0");
    }

    #[test]
    fn test_non_zero_exit_message() {
        let err = RunError::NonZeroExit { code: 2 };
        assert!(err.to_string().contains("status 2"));
    }
}
