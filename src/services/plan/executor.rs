//! Plan Execution
//!
//! The mechanical half of Plan/Execute. Walks a `ChangePlan` in order and
//! hands each operation to the toolkit unchanged. No retries, no new targets:
//! a failed operation is recorded and execution moves on.

use std::path::PathBuf;

use refine_toolkit::{ChangeLog, ChangeLogStats, ChangeRecord, MutationToolkit};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::ChangePlan;

/// Per-plan execution outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// One record per plan step, in plan order
    pub records: Vec<ChangeRecord>,
    pub succeeded: usize,
    pub failed: usize,
    /// Files with at least one successful edit, in first-touch order
    pub touched_files: Vec<String>,
}

impl ExecutionReport {
    pub fn all_failed(&self) -> bool {
        self.succeeded == 0
    }

    pub fn is_partial(&self) -> bool {
        self.succeeded > 0 && self.failed > 0
    }
}

/// Applies change plans through one `MutationToolkit`.
#[derive(Debug)]
pub struct PlanExecutor {
    toolkit: MutationToolkit,
}

impl PlanExecutor {
    pub fn new(project_root: impl Into<PathBuf>, fallback_window: usize) -> Self {
        Self {
            toolkit: MutationToolkit::new(project_root).with_fallback_window(fallback_window),
        }
    }

    pub fn execute(&mut self, plan: &ChangePlan) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for (index, step) in plan.steps.iter().enumerate() {
            let record = self.toolkit.apply(&step.operation);
            debug!(
                step = index + 1,
                file = %record.file,
                success = record.success,
                "Executed plan step"
            );
            if record.success {
                report.succeeded += 1;
                if !report.touched_files.contains(&record.file) {
                    report.touched_files.push(record.file.clone());
                }
            } else {
                report.failed += 1;
            }
            report.records.push(record);
        }

        info!(
            steps = plan.len(),
            succeeded = report.succeeded,
            failed = report.failed,
            "Plan executed"
        );
        report
    }

    /// Session change log across every executed plan.
    pub fn log(&self) -> &ChangeLog {
        self.toolkit.log()
    }

    pub fn stats(&self) -> ChangeLogStats {
        self.toolkit.stats()
    }
}
