//! Refine Engine
//!
//! Constrained mutation and iteration control for automated source
//! refinement. A recommendation goes through a read-only Discovery that
//! produces a literal change plan, a mechanical Execution through the
//! mutation toolkit, validation of every touched file, build and visual
//! verification with snapshot rollback, and scoring. Memory of every attempt
//! feeds duplicate suppression and plateau detection.
//!
//! ## Module Organization
//!
//! - `config` - `RefineConfig` loaded from `refine.toml`
//! - `models` - Plans, memory records, loop configuration and reports
//! - `services` - Plan/Execute, memory store, verification, iteration loop
//! - `utils` - Errors, logging setup, path helpers
//!
//! The mutation toolkit (`refine_toolkit`), the validation engine
//! (`refine_validation`) and the collaborator traits (`refine_core`) live in
//! their own crates and are re-exported here.

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use refine_core;
pub use refine_toolkit;
pub use refine_validation;

// ── Configuration ──────────────────────────────────────────────────────
pub use config::{DiscoveryConfig, RefineConfig, ToolkitConfig, VerificationConfig};

// ── Models ─────────────────────────────────────────────────────────────
pub use models::{
    AttemptStatus, ChangePlan, IterationMemory, IterationOutcome, IterationReport, LoopConfig,
    LoopPhase, RunSummary, StopReason,
};

// ── Services ───────────────────────────────────────────────────────────
pub use services::{
    run_single, Collaborators, IterationEvent, IterationInput, IterationLoop,
    IterationLoopConfig, IterationOutput, IterationServices, LiteralSwapProposer, PlanExecutor,
    PlanProposer, QueueRecommendationSource,
};

// ── Errors ─────────────────────────────────────────────────────────────
pub use utils::error::{EngineError, EngineResult};
