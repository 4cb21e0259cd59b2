//! External Collaborators
//!
//! Async traits for everything the iteration loop treats as an external,
//! potentially slow suspension point. Implementations live elsewhere: the
//! engine crate ships command-backed versions for the CLI, tests use
//! in-process fakes.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::recommendation::Recommendation;

// ============================================================================
// Recommendation Source
// ============================================================================

/// Supplies prioritized recommendations one at a time.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Return the next recommendation, or `None` when the source is exhausted.
    ///
    /// `context_summary` is the memory digest of previous attempts so the
    /// source can avoid repeating itself.
    async fn next_recommendation(
        &mut self,
        context_summary: &str,
    ) -> CoreResult<Option<Recommendation>>;
}

// ============================================================================
// Build / Visual Verification
// ============================================================================

/// Outcome of a build or visual check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    /// Whether the check passed
    pub success: bool,
    /// Error lines reported by the check
    #[serde(default)]
    pub errors: Vec<String>,
    /// True when the check could not run at all (tool missing) and was skipped
    #[serde(default)]
    pub skipped: bool,
}

impl BuildReport {
    /// A passing report.
    pub fn passed() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            skipped: false,
        }
    }

    /// A failing report.
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            skipped: false,
        }
    }

    /// A skipped report. Skipped checks count as success.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            errors: vec![reason.into()],
            skipped: true,
        }
    }
}

/// Compile/build check for a project.
#[async_trait]
pub trait BuildVerifier: Send + Sync {
    async fn verify(&self, project_root: &Path) -> CoreResult<BuildReport>;
}

/// Visual-regression / console-error check for a project.
#[async_trait]
pub trait VisualVerifier: Send + Sync {
    async fn check(&self, project_root: &Path) -> CoreResult<BuildReport>;
}

// ============================================================================
// Scorer
// ============================================================================

/// Composite score (0-10) plus an optional per-dimension breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub composite: f64,
    #[serde(default)]
    pub breakdown: BTreeMap<String, f64>,
}

impl ScoreReport {
    /// Create a report with only a composite score, clamped to 0-10.
    pub fn composite(score: f64) -> Self {
        Self {
            composite: score.clamp(0.0, 10.0),
            breakdown: BTreeMap::new(),
        }
    }
}

/// Re-evaluates the project after an iteration.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, project_root: &Path) -> CoreResult<ScoreReport>;
}
