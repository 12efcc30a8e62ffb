//! Error types for doconlylib

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while checking a change
#[derive(Error, Debug)]
pub enum DoconlyError {
    /// Source text is not valid Python
    #[error("{message}: line {line}, column {column}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// The lockstep walk lost track of the statement layout around a docstring
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File contents that are not UTF-8 text
    #[error("{side} version is not valid UTF-8: {source}")]
    InvalidUtf8 {
        side: &'static str,
        source: std::string::FromUtf8Error,
    },

    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Hook name that is not known
    #[error("unknown hook: {0}")]
    UnknownHook(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Git operation error
    #[error("git error: {0}")]
    GitError(String),
}

impl DoconlyError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        DoconlyError::InternalInvariant(message.into())
    }

    /// True for errors caused by the input text rather than by the checker.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, DoconlyError::Parse { .. })
    }
}
