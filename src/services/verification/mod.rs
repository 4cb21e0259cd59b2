//! Verification & Rollback
//!
//! - `snapshot` - Pre-iteration file snapshots and verified restores
//! - `command` - Subprocess-backed build check, visual check and scorer

pub mod command;
pub mod snapshot;

pub use command::{
    parse_score_output, CommandBuildVerifier, CommandScorer, CommandVisualVerifier,
};
pub use snapshot::{DiffStats, FileSnapshot, IterationSnapshot};
