//! Integration Tests Module
//!
//! End-to-end coverage across the workspace crates: mutation toolkit,
//! validation engine, Plan/Execute workflow, memory store and the iteration
//! control loop. Collaborators are in-process fakes; no external commands run.

// Shared fakes and fixtures
mod support;

// Mutation toolkit against real files
mod toolkit_test;

// Validation engine properties
mod validation_test;

// Discovery -> proposer -> executor
mod workflow_test;

// Memory persistence and duplicate suppression
mod memory_test;

// Iteration control loop scenarios
mod loop_test;
