//! Error types for mbmap-resolver
//!
//! Only structural failures are errors. A malformed record is never an
//! error value: it is skipped and counted in the pass statistics, and
//! partial coverage is a normal outcome reported through the coverage
//! report.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal resolver errors; any of these aborts the run with no output written
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A required input artifact is absent
    #[error("Input missing: {0}")]
    InputMissing(PathBuf),

    /// Archive path does not exist
    #[error("Archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    /// Container structure or compressed data could not be read
    #[error("Corrupt archive {path}: {detail}")]
    CorruptArchive { path: PathBuf, detail: String },

    /// No regular member in the archive satisfies the selector
    #[error("No archive member matches {selector}")]
    MemberNotFound { selector: String },

    /// Sought-key file could not be parsed
    #[error("Invalid sought-key file: {0}")]
    InvalidSoughtKeys(String),

    /// Result artifact could not be written
    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Caller aborted the run
    #[error("Run cancelled")]
    Cancelled,

    /// Configuration error from the shared config layer
    #[error(transparent)]
    Config(#[from] mbmap_common::Error),
}

impl ResolveError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::InputMissing(_) => "input_missing",
            ResolveError::ArchiveNotFound(_) => "archive_not_found",
            ResolveError::CorruptArchive { .. } => "corrupt_archive",
            ResolveError::MemberNotFound { .. } => "member_not_found",
            ResolveError::InvalidSoughtKeys(_) => "invalid_sought_keys",
            ResolveError::Output { .. } => "output",
            ResolveError::Cancelled => "cancelled",
            ResolveError::Config(_) => "config",
        }
    }
}

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;
