//! Memory Store
//!
//! Behavior of `IterationMemory`: recording attempts and scores, duplicate
//! suppression, the context digest fed back to the recommendation source,
//! and JSON persistence.

mod duplicate;
mod store;

pub use duplicate::{normalize_text, DuplicateKind};
