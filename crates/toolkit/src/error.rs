//! Toolkit Errors
//!
//! Every failure leaves the target file untouched. `ErrorKind` is the
//! serializable tag stored on failed change records and used for statistics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a mutation operation could not be applied.
#[derive(Error, Debug)]
pub enum MutationError {
    /// The expected before-value is not on the requested line nor within the
    /// fallback window
    #[error("'{needle}' not found on line {line} or within ±{window} lines")]
    TokenNotFound {
        needle: String,
        line: usize,
        window: usize,
    },

    /// The before-value matches more than once and the caller did not pick one
    #[error("'{needle}' matches {count} times near line {line}; pass an occurrence to disambiguate")]
    AmbiguousMatch {
        needle: String,
        line: usize,
        count: usize,
    },

    /// The requested line does not exist
    #[error("line {line} is out of range (file has {len} lines)")]
    LineOutOfRange { line: usize, len: usize },

    /// An append would duplicate a token that is already on the line
    #[error("'{token}' is already present on line {line}")]
    AlreadyPresent { token: String, line: usize },

    /// The operation path is absolute or escapes the project root
    #[error("invalid path '{0}': must be relative and inside the project root")]
    InvalidPath(String),

    /// The file is binary or not valid UTF-8
    #[error("cannot edit non-text file: {0}")]
    BinaryFile(String),

    /// The operation itself is malformed (empty before-value, line 0, ...)
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TokenNotFound,
    AmbiguousMatch,
    LineOutOfRange,
    AlreadyPresent,
    InvalidPath,
    BinaryFile,
    InvalidOperation,
    Io,
}

impl MutationError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::TokenNotFound { .. } => ErrorKind::TokenNotFound,
            MutationError::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            MutationError::LineOutOfRange { .. } => ErrorKind::LineOutOfRange,
            MutationError::AlreadyPresent { .. } => ErrorKind::AlreadyPresent,
            MutationError::InvalidPath(_) => ErrorKind::InvalidPath,
            MutationError::BinaryFile(_) => ErrorKind::BinaryFile,
            MutationError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            MutationError::Io(_) => ErrorKind::Io,
        }
    }

    /// True when the target could not be located in the file text
    /// (not found, ambiguous, or out of range).
    pub fn is_target_resolution(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TokenNotFound | ErrorKind::AmbiguousMatch | ErrorKind::LineOutOfRange
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::TokenNotFound => "token_not_found",
            ErrorKind::AmbiguousMatch => "ambiguous_match",
            ErrorKind::LineOutOfRange => "line_out_of_range",
            ErrorKind::AlreadyPresent => "already_present",
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::BinaryFile => "binary_file",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::Io => "io",
        };
        write!(f, "{}", s)
    }
}
