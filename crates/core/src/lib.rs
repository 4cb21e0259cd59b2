//! Refine Core
//!
//! Foundational types shared by every crate in the refine workspace. This
//! crate has zero dependencies on the mutation toolkit, the validation engine,
//! or the iteration loop.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `recommendation` - The `Recommendation` handed in by the recommendation source
//! - `collaborators` - Async traits for the external collaborators (recommendation
//!   source, build/visual verifiers, scorer) and their report types
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/async-trait/thiserror**
//! 2. **Trait-based abstractions** - every slow external step sits behind a trait
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod collaborators;
pub mod error;
pub mod recommendation;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Recommendation ─────────────────────────────────────────────────────
pub use recommendation::Recommendation;

// ── Collaborators ──────────────────────────────────────────────────────
pub use collaborators::{
    BuildReport, BuildVerifier, RecommendationSource, ScoreReport, Scorer, VisualVerifier,
};
