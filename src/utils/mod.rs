//! Utilities
//!
//! Error types, logging setup and path helpers used throughout the engine.

pub mod error;
pub mod logging;
pub mod paths;

pub use error::*;
pub use paths::*;
