//! Iteration Memory Store
//!
//! Read/write API over `IterationMemory`. The iteration loop is the only
//! writer; everything else gets `&IterationMemory`.

use std::path::Path;

use refine_core::Recommendation;
use refine_toolkit::ChangeRecord;
use tracing::{debug, info};

use super::duplicate::{component_of, find_duplicate, DuplicateKind};
use crate::models::{
    AttemptStatus, AttemptedRecommendation, FailureEntry, FileChange, IterationMemory,
    ScoreHistoryEntry,
};
use crate::utils::error::EngineResult;
use crate::utils::paths::ensure_parent_dir;

/// Number of recent entries listed per section of the context summary.
const SUMMARY_LIMIT: usize = 5;

/// Score deltas are kept at this precision so threshold comparisons are stable.
fn round_delta(delta: f64) -> f64 {
    (delta * 10_000.0).round() / 10_000.0
}

impl IterationMemory {
    // ========================================================================
    // Writes
    // ========================================================================

    /// Record the outcome of one recommendation.
    ///
    /// `changes` are the change records the attempt produced. A `Success`
    /// without a single successful record is stored as `NoEffect`, so every
    /// successful attempt has at least one entry in `successful_changes`.
    /// Returns the status actually stored.
    pub fn record_attempt(
        &mut self,
        recommendation: &Recommendation,
        iteration: u32,
        status: AttemptStatus,
        reason: impl Into<String>,
        changes: &[ChangeRecord],
    ) -> AttemptStatus {
        let reason = reason.into();
        let applied: Vec<&ChangeRecord> = changes.iter().filter(|c| c.success).collect();

        let status = if status == AttemptStatus::Success && applied.is_empty() {
            AttemptStatus::NoEffect
        } else {
            status
        };

        let mut files_modified: Vec<String> = Vec::new();
        for change in &applied {
            if !files_modified.contains(&change.file) {
                files_modified.push(change.file.clone());
            }
        }
        let component = component_of(recommendation, &files_modified);

        if status == AttemptStatus::Success {
            for change in &applied {
                self.successful_changes.push(FileChange {
                    iteration,
                    file: change.file.clone(),
                    line: change.resolved_line.unwrap_or(change.requested_line),
                    before: change.before.clone(),
                    after: change.after.clone(),
                    recommendation: recommendation.title.clone(),
                });
            }
            if let Some(component) = &component {
                *self
                    .context
                    .component_modifications
                    .entry(component.clone())
                    .or_insert(0) += 1;
            }
            self.context.last_modified_component = component.clone();
            self.context.last_modified_files = files_modified.clone();
        } else {
            self.failures.push(FailureEntry {
                recommendation: recommendation.title.clone(),
                reason: reason.clone(),
                iteration,
            });
        }

        if let Some(component) = &component {
            *self
                .context
                .component_attempts
                .entry(component.clone())
                .or_insert(0) += 1;
        }

        debug!(
            iteration,
            status = %status,
            title = %recommendation.title,
            files = files_modified.len(),
            "Recorded attempt"
        );

        self.attempted.push(AttemptedRecommendation {
            recommendation: recommendation.clone(),
            iteration,
            status,
            reason,
            files_modified: if status == AttemptStatus::Success {
                files_modified
            } else {
                Vec::new()
            },
            component,
            attempted_at: chrono::Utc::now().to_rfc3339(),
        });
        self.touch();
        status
    }

    /// Append a score history entry and update the plateau counter.
    ///
    /// Returns the delta.
    pub fn record_score(&mut self, iteration: u32, before: f64, after: f64) -> f64 {
        let delta = round_delta(after - before);
        self.score_history.push(ScoreHistoryEntry {
            iteration,
            before,
            after,
            delta,
        });
        if delta < self.settings.min_improvement {
            self.plateau_counter += 1;
        } else {
            self.plateau_counter = 0;
        }
        debug!(iteration, before, after, delta, plateau = self.plateau_counter, "Recorded score");
        self.touch();
        delta
    }

    /// Clear everything except the settings. Only used when a fresh run starts.
    pub fn reset(&mut self) {
        *self = IterationMemory::new(self.settings.clone());
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Whether the last `window` iterations all fell below `min_improvement`.
    pub fn is_plateaued(&self, window: u32) -> bool {
        window > 0 && self.plateau_counter >= window
    }

    /// Score after the most recent scored iteration.
    pub fn latest_score(&self) -> Option<f64> {
        self.score_history.last().map(|s| s.after)
    }

    pub fn is_duplicate(&self, recommendation: &Recommendation) -> bool {
        find_duplicate(self, recommendation).is_some()
    }

    /// Which duplicate rule, if any, suppresses `recommendation`.
    pub fn duplicate_kind(&self, recommendation: &Recommendation) -> Option<DuplicateKind> {
        find_duplicate(self, recommendation)
    }

    /// Committed modifications recorded for `component`.
    pub fn modification_count(&self, component: &str) -> u32 {
        self.context
            .component_modifications
            .get(component)
            .copied()
            .unwrap_or(0)
    }

    /// Human-readable digest for the recommendation source.
    pub fn context_summary(&self) -> String {
        let mut out = String::new();

        if self.attempted.is_empty() && self.score_history.is_empty() {
            return "No previous iterations.".to_string();
        }

        if let Some(last) = self.score_history.last() {
            let first = self.score_history[0].before;
            out.push_str(&format!(
                "Score: {:.2} -> {:.2} over {} iteration(s) (last delta {:+.2}).\n",
                first,
                last.after,
                self.score_history.len(),
                last.delta
            ));
        }
        if self.plateau_counter > 0 {
            out.push_str(&format!(
                "Low-improvement streak: {} iteration(s).\n",
                self.plateau_counter
            ));
        }

        let successes: Vec<&AttemptedRecommendation> = self
            .attempted
            .iter()
            .filter(|a| a.status == AttemptStatus::Success)
            .collect();
        if !successes.is_empty() {
            out.push_str("Applied:\n");
            for attempt in successes.iter().rev().take(SUMMARY_LIMIT) {
                out.push_str(&format!(
                    "- [{}] {} ({})\n",
                    attempt.recommendation.dimension,
                    attempt.recommendation.title,
                    attempt.files_modified.join(", ")
                ));
            }
        }

        let unsuccessful: Vec<&AttemptedRecommendation> = self
            .attempted
            .iter()
            .filter(|a| a.status != AttemptStatus::Success)
            .collect();
        if !unsuccessful.is_empty() {
            out.push_str("Do not repeat:\n");
            for attempt in unsuccessful.iter().rev().take(SUMMARY_LIMIT) {
                out.push_str(&format!(
                    "- [{}] {} ({}: {})\n",
                    attempt.recommendation.dimension,
                    attempt.recommendation.title,
                    attempt.status,
                    attempt.reason
                ));
            }
        }

        if let Some(component) = &self.context.last_modified_component {
            out.push_str(&format!("Last modified component: {}\n", component));
        }
        if !self.context.component_modifications.is_empty() {
            let counts: Vec<String> = self
                .context
                .component_modifications
                .iter()
                .map(|(c, n)| format!("{} x{}", c, n))
                .collect();
            out.push_str(&format!("Component modifications: {}\n", counts.join(", ")));
        }

        out.trim_end().to_string()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the memory as pretty JSON.
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        ensure_parent_dir(path)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), attempts = self.attempted.len(), "Saved iteration memory");
        Ok(())
    }

    /// Read memory written by [`IterationMemory::save`].
    pub fn load(path: &Path) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load from `path` if it exists, otherwise start empty.
    pub fn load_or_default(path: &Path) -> EngineResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
