//! Collaborator Errors
//!
//! What a recommendation source, build or visual check, or scorer can fail
//! with. The engine wraps these in its own error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The external command ran and reported failure
    #[error("Command error: {0}")]
    Command(String),

    /// The external program could not be found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Output that could not be understood (score text, manifests, queues)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The collaborator did not answer in time
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}
