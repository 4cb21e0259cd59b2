//! Data Models
//!
//! Plain data types shared between the engine services.

pub mod iteration;
pub mod memory;
pub mod plan;

pub use iteration::*;
pub use memory::*;
pub use plan::*;
