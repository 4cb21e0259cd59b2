//! Refine Mutation Toolkit
//!
//! A small, closed set of atomic file-edit operations. Every operation names a
//! file, a 1-based line and the literal "before" value it expects to find
//! there. A call either lands exactly one before→after replacement on one
//! line, or leaves the file byte-identical and reports why.
//!
//! - `operation` - `MutationOperation` and `OperationKind`
//! - `matcher` - Token / property / text-run matching on a single line and
//!   the bounded fallback search
//! - `record` - `ChangeRecord`, the append-only `ChangeLog`, and statistics
//! - `toolkit` - `MutationToolkit`, which reads, edits and atomically writes files
//! - `text_utils` - Binary vs text detection

pub mod error;
pub mod matcher;
pub mod operation;
pub mod record;
pub mod text_utils;
pub mod toolkit;

pub use error::{ErrorKind, MutationError};
pub use matcher::{locate, matching_lines, Resolution, DEFAULT_FALLBACK_WINDOW};
pub use operation::{MutationOperation, OperationKind};
pub use record::{ChangeLog, ChangeLogStats, ChangeRecord, KindStats};
pub use text_utils::decode_editable_text;
pub use toolkit::{apply_to_text, MutationToolkit, TextEdit};
