//! slowest-tally - multi-run slowest-test aggregation
//!
//! Runs a test suite's "top N slowest tests" report many times, merges the
//! per-run lists into a cross-run ledger keyed by test identity and derives
//! timing statistics, a top-K summary and distribution tables.
//!
//! Pipeline: [`executor`] → [`parser`] → [`ledger`] (once per run) →
//! [`analysis`] → [`report`] (once, after all runs).

pub mod analysis;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod executor;
pub mod json_output;
pub mod ledger;
pub mod parser;
pub mod report;
pub mod session;
pub mod text_output;
