//! Error Handling
//!
//! Engine-level error type. Wraps the core, toolkit and configuration errors
//! and adds the failure modes of the iteration loop itself.

use refine_core::CoreError;
use refine_toolkit::MutationError;
use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Errors raised by collaborators or core helpers
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Toolkit errors surfaced outside a change record
    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A suspension point exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Restoring a snapshot failed or left files different from the snapshot
    #[error("Rollback error: {0}")]
    Rollback(String),

    #[error("Cancelled")]
    Cancelled,

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine errors
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a rollback error
    pub fn rollback(msg: impl Into<String>) -> Self {
        Self::Rollback(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error is a timeout, including collaborator timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Timeout(_) | EngineError::Core(CoreError::Timeout(_)))
    }
}

impl From<EngineError> for String {
    fn from(err: EngineError) -> String {
        err.to_string()
    }
}
