//! Iteration Control Loop
//!
//! - `loop_runner` - The multi-iteration driver with rollback and plateau detection
//! - `entry` - Single-iteration entry point over explicit inputs and outputs

mod entry;
mod loop_runner;

pub use entry::{run_single, IterationInput, IterationOutput, IterationServices};
pub use loop_runner::{
    Collaborators, IterationEvent, IterationLoop, IterationLoopConfig, IterationStep,
};
