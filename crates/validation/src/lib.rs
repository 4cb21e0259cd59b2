//! Refine Validation Engine
//!
//! Decides whether a modified file is an acceptable successor of its original:
//!
//! - `constraints` - `ValidationConstraints` and the effort bracket table
//! - `models` - `ValidationResult`, `CrossFileValidationResult` and friends
//! - `interface` - Export / import / props extraction for JS and TS sources
//! - `engine` - Single-file validation (`validate`)
//! - `cross_file` - Dependency-aware breaking-change analysis (`validate_cross_file`)
//! - `detector` - Project type detection from marker files
//! - `gates` - Build command selection per project type

/// Define `fn $name() -> &'static Regex`, compiled on first use.
#[macro_export]
macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static ::regex::Regex {
            static RE: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            RE.get_or_init(|| ::regex::Regex::new($pattern).expect("static regex"))
        }
    };
}

pub mod constraints;
pub mod cross_file;
pub mod detector;
pub mod engine;
pub mod gates;
pub mod interface;
pub mod models;

// ── Constraints ──
pub use constraints::{EffortBracket, ValidationConstraints};

// ── Results ──
pub use models::{
    BreakingChange, BreakingKind, CrossFileValidationResult, Impact, ValidationResult, Violation,
    ViolationKind,
};

// ── Validation entry points ──
pub use cross_file::{validate_cross_file, AnalyzerError, CrossFileAnalyzer};
pub use engine::{changed_line_count, validate};

// ── Interface extraction ──
pub use interface::{extract_exports, extract_imports, extract_interface, ExportSet, ImportStatement};

// ── Project detection ──
pub use detector::{detect_project_type, ProjectDetection, ProjectDetector, ProjectType};
pub use gates::{build_gate_for, BuildGate};
