// ============================================================
// Layer 3 — Motif Comparison Outcomes
// ============================================================
// The external comparison tool is treated as a subprocess with
// an explicit contract: program path, two arguments, an expected
// output file and a timeout. Every way it can go wrong has its
// own error variant, so "the tool crashed" is never confused
// with "the tool found nothing".
//
// The pipeline still keeps going after a failure (the trial is
// scored as zero matches) but the status ends up in the record.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the table the comparison tool writes into its output directory
pub const RESULTS_FILE: &str = "tomtom.tsv";

/// A successful tool run.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOutcome {
    /// The tool wrote a results table with at least one data row
    Results(PathBuf),
    /// The tool exited cleanly but the table is absent or has no rows
    Empty,
}

#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error("comparison tool '{0}' not found")]
    NotFound(PathBuf),

    #[error("failed to launch comparison tool '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot clear previous results '{path}': {source}")]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("comparison tool exited with {code:?}: {stderr}")]
    Crashed { code: Option<i32>, stderr: String },

    #[error("comparison tool did not finish within {0:?}")]
    TimedOut(Duration),
}

/// What happened to the comparison step, as stored in records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    Matched,
    Empty,
    ToolNotFound,
    /// The program exists but could not be started (permissions,
    /// bad interpreter) or its output directory could not be prepared
    LaunchFailed,
    ToolCrashed,
    TimedOut,
    /// The tool wrote a table that could not be parsed
    Malformed,
}

impl ComparisonStatus {
    pub fn of(result: &Result<ComparisonOutcome, ComparisonError>) -> Self {
        match result {
            Ok(ComparisonOutcome::Results(_))        => Self::Matched,
            Ok(ComparisonOutcome::Empty)             => Self::Empty,
            Err(ComparisonError::NotFound(_))        => Self::ToolNotFound,
            Err(ComparisonError::Spawn { .. })       => Self::LaunchFailed,
            Err(ComparisonError::StaleOutput { .. }) => Self::LaunchFailed,
            Err(ComparisonError::Crashed { .. })     => Self::ToolCrashed,
            Err(ComparisonError::TimedOut(_))        => Self::TimedOut,
        }
    }
}
