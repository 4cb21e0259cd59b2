//! Services
//!
//! Behavior of the engine, leaf-first:
//!
//! - `plan` - Discovery, proposers and plan execution
//! - `memory` - Iteration memory store and duplicate suppression
//! - `verification` - Snapshots, rollback and command-backed collaborators
//! - `recommendation` - Queue-backed recommendation source
//! - `iteration` - The iteration control loop

pub mod iteration;
pub mod memory;
pub mod plan;
pub mod recommendation;
pub mod verification;

pub use iteration::{
    run_single, Collaborators, IterationEvent, IterationInput, IterationLoop,
    IterationLoopConfig, IterationOutput, IterationServices, IterationStep,
};
pub use memory::{normalize_text, DuplicateKind};
pub use plan::{
    Discovery, ExecutionReport, GroundedPlan, LiteralSwapProposer, PlanExecutor, PlanProposer,
};
pub use recommendation::QueueRecommendationSource;
pub use verification::{
    CommandBuildVerifier, CommandScorer, CommandVisualVerifier, IterationSnapshot,
};
