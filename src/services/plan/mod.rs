//! Plan/Execute Workflow
//!
//! - `proposer` - `PlanProposer` trait and the built-in `LiteralSwapProposer`
//! - `discovery` - Read-only candidate enumeration and plan grounding
//! - `executor` - In-order plan application through the mutation toolkit

pub mod discovery;
pub mod executor;
pub mod proposer;

pub use discovery::{Discovery, DroppedOperation, GroundedPlan};
pub use executor::{ExecutionReport, PlanExecutor};
pub use proposer::{parse_directives, Directive, LiteralSwapProposer, PlanProposer};
