//! Single-iteration Entry Point
//!
//! Takes `{recommendation, project root, prior memory, constraints}` and
//! returns `{file changes, validation results, new memory, outcome}`. The
//! surrounding system owns the loop; this runs exactly one iteration of it.

use std::path::PathBuf;

use async_trait::async_trait;
use refine_core::{
    BuildVerifier, CoreResult, Recommendation, RecommendationSource, Scorer, VisualVerifier,
};
use refine_toolkit::ChangeRecord;
use refine_validation::{ValidationConstraints, ValidationResult};
use serde::Serialize;

use super::loop_runner::{Collaborators, IterationLoop, IterationLoopConfig, IterationStep};
use crate::config::RefineConfig;
use crate::models::{IterationMemory, IterationOutcome, IterationReport};
use crate::services::plan::PlanProposer;
use crate::utils::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
pub struct IterationInput {
    pub recommendation: Recommendation,
    pub project_root: PathBuf,
    pub prior_memory: IterationMemory,
    pub constraints: ValidationConstraints,
}

/// Collaborators for a single iteration; the recommendation comes from the input.
pub struct IterationServices {
    pub proposer: Box<dyn PlanProposer>,
    pub build: Box<dyn BuildVerifier>,
    pub visual: Option<Box<dyn VisualVerifier>>,
    pub scorer: Box<dyn Scorer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationOutput {
    pub file_changes: Vec<ChangeRecord>,
    pub validation: Vec<ValidationResult>,
    pub new_memory: IterationMemory,
    pub iteration_outcome: IterationOutcome,
    /// Full record of the iteration
    pub report: IterationReport,
}

struct OneShotSource(Option<Recommendation>);

#[async_trait]
impl RecommendationSource for OneShotSource {
    async fn next_recommendation(
        &mut self,
        _context_summary: &str,
    ) -> CoreResult<Option<Recommendation>> {
        Ok(self.0.take())
    }
}

/// Run one iteration for `input`.
///
/// `config` supplies everything except the constraints, which come from the
/// input. A recommendation the prior memory marks as a duplicate yields a
/// `no_effect` report without touching any file.
pub async fn run_single(
    input: IterationInput,
    services: IterationServices,
    config: &RefineConfig,
) -> EngineResult<IterationOutput> {
    let mut loop_config = IterationLoopConfig::from_config(&input.project_root, config);
    loop_config.constraints = input.constraints;
    loop_config.loop_config.max_proposals_per_iteration = 1;

    let collaborators = Collaborators {
        source: Box::new(OneShotSource(Some(input.recommendation))),
        proposer: services.proposer,
        build: services.build,
        visual: services.visual,
        scorer: services.scorer,
    };

    let mut runner = IterationLoop::new(loop_config, collaborators).with_memory(input.prior_memory);
    let report = match runner.run_once().await? {
        IterationStep::Completed(report) => report,
        IterationStep::SourceExhausted { .. } => {
            return Err(EngineError::internal("recommendation was not consumed"))
        }
        IterationStep::Cancelled(_) => return Err(EngineError::Cancelled),
    };

    Ok(IterationOutput {
        file_changes: report.change_records.clone(),
        validation: report.validations.clone(),
        new_memory: runner.into_memory(),
        iteration_outcome: report.outcome,
        report,
    })
}
