//! Iteration Memory Models
//!
//! The per-project ledger the iteration loop keeps across iterations. The
//! JSON form (camelCase) is a stable contract for anything persisting it.
//! Behavior lives in `services::memory`.

use std::collections::BTreeMap;

use refine_core::Recommendation;
use serde::{Deserialize, Serialize};

/// How an attempted recommendation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Changes committed and verification passed
    Success,
    /// Planning failed or validation rejected every change
    Failed,
    /// Nothing applicable was found or changed
    NoEffect,
    /// Build, visual check or scoring failed and the iteration was rolled back
    BrokeBuild,
}

impl AttemptStatus {
    /// Statuses that count against a recommendation for duplicate suppression.
    pub fn is_unproductive(&self) -> bool {
        matches!(self, AttemptStatus::Failed | AttemptStatus::NoEffect)
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptStatus::Success => write!(f, "success"),
            AttemptStatus::Failed => write!(f, "failed"),
            AttemptStatus::NoEffect => write!(f, "no_effect"),
            AttemptStatus::BrokeBuild => write!(f, "broke_build"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptedRecommendation {
    pub recommendation: Recommendation,
    pub iteration: u32,
    pub status: AttemptStatus,
    pub reason: String,
    #[serde(default)]
    pub files_modified: Vec<String>,
    /// Component the attempt was attributed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub attempted_at: String,
}

/// One committed edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub iteration: u32,
    pub file: String,
    pub line: usize,
    pub before: String,
    pub after: String,
    /// Title of the recommendation that produced the change
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    pub recommendation: String,
    pub reason: String,
    pub iteration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreHistoryEntry {
    pub iteration: u32,
    pub before: f64,
    pub after: f64,
    pub delta: f64,
}

/// What the loop last touched, and how often each component was touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextAwareness {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_component: Option<String>,
    #[serde(default)]
    pub last_modified_files: Vec<String>,
    /// Committed modifications per component; never decreases within a run
    #[serde(default)]
    pub component_modifications: BTreeMap<String, u32>,
    /// Attempts per component, whatever their outcome
    #[serde(default)]
    pub component_attempts: BTreeMap<String, u32>,
}

/// Thresholds the memory applies on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySettings {
    /// Deltas below this count toward a plateau
    #[serde(default = "default_min_improvement")]
    pub min_improvement: f64,
    /// Attempts on a component before near-duplicates are suppressed
    #[serde(default = "default_near_duplicate_threshold")]
    pub near_duplicate_threshold: u32,
}

fn default_min_improvement() -> f64 {
    0.05
}

fn default_near_duplicate_threshold() -> u32 {
    3
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            min_improvement: default_min_improvement(),
            near_duplicate_threshold: default_near_duplicate_threshold(),
        }
    }
}

/// Per-project ledger owned by the iteration loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationMemory {
    #[serde(default)]
    pub attempted: Vec<AttemptedRecommendation>,
    #[serde(default)]
    pub successful_changes: Vec<FileChange>,
    #[serde(default)]
    pub failures: Vec<FailureEntry>,
    #[serde(default)]
    pub score_history: Vec<ScoreHistoryEntry>,
    /// Consecutive iterations whose delta was below `min_improvement`
    #[serde(default)]
    pub plateau_counter: u32,
    #[serde(default)]
    pub context: ContextAwareness,
    #[serde(default)]
    pub settings: MemorySettings,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for IterationMemory {
    fn default() -> Self {
        Self::new(MemorySettings::default())
    }
}

impl IterationMemory {
    pub fn new(settings: MemorySettings) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            attempted: Vec::new(),
            successful_changes: Vec::new(),
            failures: Vec::new(),
            score_history: Vec::new(),
            plateau_counter: 0,
            context: ContextAwareness::default(),
            settings,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
