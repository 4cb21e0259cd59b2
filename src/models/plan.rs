//! Change Plan Models
//!
//! A `ChangePlan` is the only thing that crosses from Discovery to Execution:
//! concrete operations with literal before/after values and a rationale each.

use refine_toolkit::MutationOperation;
use serde::{Deserialize, Serialize};

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedChange {
    pub operation: MutationOperation,
    #[serde(default)]
    pub rationale: String,
}

impl PlannedChange {
    pub fn new(operation: MutationOperation, rationale: impl Into<String>) -> Self {
        Self {
            operation,
            rationale: rationale.into(),
        }
    }
}

/// Ordered list of operations produced once per recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlan {
    /// Free-text summary of the approach
    #[serde(default)]
    pub strategy: String,
    /// What the plan is expected to improve
    #[serde(default)]
    pub expected_impact: String,
    #[serde(default)]
    pub steps: Vec<PlannedChange>,
}

impl ChangePlan {
    pub fn new(strategy: impl Into<String>, expected_impact: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            expected_impact: expected_impact.into(),
            steps: Vec::new(),
        }
    }

    /// A plan with no steps; `reason` becomes the strategy text.
    pub fn empty(reason: impl Into<String>) -> Self {
        Self::new(reason, "")
    }

    pub fn push(&mut self, operation: MutationOperation, rationale: impl Into<String>) {
        self.steps.push(PlannedChange::new(operation, rationale));
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Files named by the plan, in first-use order.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for step in &self.steps {
            let file = step.operation.file();
            if !files.iter().any(|f| f == file) {
                files.push(file.to_string());
            }
        }
        files
    }
}

/// A file Discovery read for the proposer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFile {
    /// Path relative to the project root
    pub path: String,
    pub content: String,
    /// Keyword relevance used for ordering
    #[serde(default)]
    pub relevance: usize,
}

impl CandidateFile {
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}
