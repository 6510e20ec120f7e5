//! Error types for the counting engine.
//!
//! Malformed log lines are deliberately absent: a line that matches neither
//! grammar is skipped, never reported.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    /// File missing, unreadable, or a corrupt gzip stream.
    #[error("could not read log file {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Chart limits or other boundary options that cannot be honoured.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A `--start`/`--end` value in none of the accepted layouts.
    #[error("invalid date '{0}': expected yyyymmdd, yyyymmddhhmmss or yyyymmddThhmmss")]
    InvalidDate(String),

    /// CSV or chart output could not be written.
    #[error("could not write report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = UsageError> = std::result::Result<T, E>;
