//! Error types for the library API.

use thiserror::Error;

/// Errors surfaced by the library engine.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested prompt, template or saved search does not exist.
    #[error("'{0}' not found")]
    NotFound(String),

    /// Malformed frontmatter or variable binding.
    #[error("parse error: {0}")]
    Parse(String),

    /// A boolean expression failed to parse, with the byte offset of the
    /// offending token.
    #[error("invalid expression at offset {offset}: {message}")]
    ExprParse { offset: usize, message: String },

    /// Invalid identifier, missing required variable, or similar.
    #[error("validation error: {0}")]
    Validation(String),

    /// An underlying file I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The revision-control client exited non-zero.
    #[error("git {command} failed: {stderr}")]
    Subprocess { command: String, stderr: String },

    /// The revision-control client exceeded its deadline.
    #[error("git {command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    /// Reconciliation exhausted every strategy short of a hard reset.
    #[error("sync conflict: {0}")]
    Conflict(String),
}

impl From<crate::core::boolean::ParseError> for Error {
    fn from(err: crate::core::boolean::ParseError) -> Self {
        Error::ExprParse {
            offset: err.offset,
            message: err.message,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
