//! Validation Result Types

use serde::{Deserialize, Serialize};

/// Category of a single-file violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    LineDelta,
    Growth,
    EffortExceeded,
    DefaultExportChanged,
    ExportRemoved,
    ImportRemoved,
    /// A high-impact cross-file breaking change escalated by the caller
    CrossFileBreaking,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ViolationKind::LineDelta => "line_delta",
            ViolationKind::Growth => "growth",
            ViolationKind::EffortExceeded => "effort_exceeded",
            ViolationKind::DefaultExportChanged => "default_export_changed",
            ViolationKind::ExportRemoved => "export_removed",
            ViolationKind::ImportRemoved => "import_removed",
            ViolationKind::CrossFileBreaking => "cross_file_breaking",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Verdict for one original/modified pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// File the verdict applies to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub valid: bool,
    pub original_line_count: usize,
    pub modified_line_count: usize,
    /// `modified - original`
    pub line_delta: i64,
    /// `(modified - original) / original`
    pub growth_ratio: f64,
    /// Lines touched according to a line diff
    pub changed_lines: usize,
    pub exports_changed: bool,
    pub imports_changed: bool,
    /// Ordered, in the order the checks ran
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn for_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Append a violation and mark the result invalid.
    pub fn push_violation(&mut self, violation: Violation) {
        self.valid = false;
        self.violations.push(violation);
    }

    pub fn violation_messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }
}

/// Kind of interface change found by the cross-file analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakingKind {
    PropRemoved,
    PropTypeChanged,
    ExportChanged,
    TypeChanged,
}

impl std::fmt::Display for BreakingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BreakingKind::PropRemoved => "PropRemoved",
            BreakingKind::PropTypeChanged => "PropTypeChanged",
            BreakingKind::ExportChanged => "ExportChanged",
            BreakingKind::TypeChanged => "TypeChanged",
        };
        write!(f, "{}", s)
    }
}

/// Risk classification for a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Impact::Low => write!(f, "low"),
            Impact::Medium => write!(f, "medium"),
            Impact::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakingChange {
    pub kind: BreakingKind,
    /// Export, prop (`ButtonProps.variant`) or type alias name
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    pub impact: Impact,
}

/// Verdict of the dependency-aware analyzer for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossFileValidationResult {
    pub valid: bool,
    pub breaking_changes: Vec<BreakingChange>,
    /// Dependents (relative to the project root) that use a changed name
    pub affected_files: Vec<String>,
    pub suggestions: Vec<String>,
    /// True when the analyzer failed and the check was skipped
    #[serde(default)]
    pub skipped: bool,
}

impl CrossFileValidationResult {
    pub fn unchanged() -> Self {
        Self {
            valid: true,
            ..Default::default()
        }
    }

    /// Fail-open verdict: valid, with a note that the check did not run.
    pub fn skipped(reason: impl std::fmt::Display) -> Self {
        Self {
            valid: true,
            suggestions: vec![format!("Cross-file check skipped: {}", reason)],
            skipped: true,
            ..Default::default()
        }
    }

    pub fn high_impact(&self) -> impl Iterator<Item = &BreakingChange> {
        self.breaking_changes
            .iter()
            .filter(|c| c.impact == Impact::High)
    }

    pub fn has_high_impact(&self) -> bool {
        self.high_impact().next().is_some()
    }
}
