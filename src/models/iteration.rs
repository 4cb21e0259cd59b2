//! Iteration Models
//!
//! Configuration, phases, outcomes and per-iteration reports of the
//! iteration control loop.

use refine_core::{BuildReport, Recommendation};
use refine_toolkit::ChangeRecord;
use refine_validation::{CrossFileValidationResult, ValidationResult};
use serde::{Deserialize, Serialize};

use super::memory::AttemptStatus;
use super::plan::ChangePlan;

/// Configuration for the iteration loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Iteration budget for one run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Stop once the composite score reaches this value
    #[serde(default = "default_target_score")]
    pub target_score: f64,
    /// Deltas below this count toward a plateau
    #[serde(default = "default_min_improvement")]
    pub min_improvement: f64,
    /// Consecutive low-delta iterations that declare a plateau
    #[serde(default = "default_plateau_window")]
    pub plateau_window: u32,
    /// Consecutive rolled-back iterations that end the run as failed
    #[serde(default = "default_max_consecutive_rollbacks")]
    pub max_consecutive_rollbacks: u32,
    /// Bound on every external suspension point, in seconds
    #[serde(default = "default_phase_timeout")]
    pub phase_timeout_secs: u64,
    /// Recommendations pulled per iteration before giving up on duplicates
    #[serde(default = "default_max_proposals")]
    pub max_proposals_per_iteration: u32,
    /// Attempts on a component before near-duplicates are suppressed
    #[serde(default = "default_near_duplicate_threshold")]
    pub near_duplicate_threshold: u32,
    /// Run the cross-file analyzer on touched files
    #[serde(default = "default_true")]
    pub cross_file_check: bool,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_target_score() -> f64 {
    9.0
}

fn default_min_improvement() -> f64 {
    0.05
}

fn default_plateau_window() -> u32 {
    3
}

fn default_max_consecutive_rollbacks() -> u32 {
    3
}

fn default_phase_timeout() -> u64 {
    300 // 5 minutes
}

fn default_max_proposals() -> u32 {
    5
}

fn default_near_duplicate_threshold() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            target_score: default_target_score(),
            min_improvement: default_min_improvement(),
            plateau_window: default_plateau_window(),
            max_consecutive_rollbacks: default_max_consecutive_rollbacks(),
            phase_timeout_secs: default_phase_timeout(),
            max_proposals_per_iteration: default_max_proposals(),
            near_duplicate_threshold: default_near_duplicate_threshold(),
            cross_file_check: true,
        }
    }
}

/// Phase of the iteration state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    #[default]
    Idle,
    Proposing,
    Planning,
    Executing,
    Verifying,
    Scoring,
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopPhase::Idle => write!(f, "idle"),
            LoopPhase::Proposing => write!(f, "proposing"),
            LoopPhase::Planning => write!(f, "planning"),
            LoopPhase::Executing => write!(f, "executing"),
            LoopPhase::Verifying => write!(f, "verifying"),
            LoopPhase::Scoring => write!(f, "scoring"),
        }
    }
}

/// Decision at the end of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IterationOutcome {
    Continue,
    TargetReached,
    Plateaued,
    Failed,
}

impl std::fmt::Display for IterationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IterationOutcome::Continue => write!(f, "continue"),
            IterationOutcome::TargetReached => write!(f, "targetReached"),
            IterationOutcome::Plateaued => write!(f, "plateaued"),
            IterationOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    Plateaued,
    /// Unrecoverable: repeated rollbacks or a failed restore
    Failed,
    BudgetExhausted,
    /// The recommendation source has nothing left
    SourceExhausted,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::TargetReached => "target_reached",
            StopReason::Plateaued => "plateaued",
            StopReason::Failed => "failed",
            StopReason::BudgetExhausted => "budget_exhausted",
            StopReason::SourceExhausted => "source_exhausted",
            StopReason::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Cross-file verdict for one touched file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCrossCheck {
    pub file: String,
    pub result: CrossFileValidationResult,
}

/// A recommendation skipped during Proposing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecommendation {
    pub title: String,
    pub reason: String,
}

/// Everything one iteration attempted, and why it was kept or reverted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationReport {
    pub iteration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    #[serde(default)]
    pub skipped: Vec<SkippedRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ChangePlan>,
    #[serde(default)]
    pub change_records: Vec<ChangeRecord>,
    #[serde(default)]
    pub validations: Vec<ValidationResult>,
    #[serde(default)]
    pub cross_file: Vec<FileCrossCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<BuildReport>,
    /// Files restored from the pre-iteration snapshot
    #[serde(default)]
    pub rolled_back: Vec<String>,
    /// Files whose changes were kept
    #[serde(default)]
    pub committed: Vec<String>,
    pub status: AttemptStatus,
    pub reason: String,
    pub score_before: f64,
    pub score_after: f64,
    pub delta: f64,
    pub outcome: IterationOutcome,
    /// A failed outcome that must end the run
    #[serde(default)]
    pub fatal: bool,
}

impl IterationReport {
    pub(crate) fn new(iteration: u32, score: f64) -> Self {
        Self {
            iteration,
            recommendation: None,
            skipped: Vec::new(),
            plan: None,
            change_records: Vec::new(),
            validations: Vec::new(),
            cross_file: Vec::new(),
            build: None,
            visual: None,
            rolled_back: Vec::new(),
            committed: Vec::new(),
            status: AttemptStatus::NoEffect,
            reason: String::new(),
            score_before: score,
            score_after: score,
            delta: 0.0,
            outcome: IterationOutcome::Continue,
            fatal: false,
        }
    }

    pub fn was_rolled_back(&self) -> bool {
        !self.rolled_back.is_empty()
    }
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub iterations: Vec<IterationReport>,
    pub initial_score: f64,
    pub final_score: f64,
    pub duration_ms: u64,
}
