//! Validation Constraints
//!
//! Named limits with documented defaults. Effort-scaled limits are a lookup
//! table of brackets rather than nested conditionals.

use serde::{Deserialize, Serialize};

/// One row of the effort table: efforts in `min..=max` may move the file's
/// line count by at most `max_changed_lines`. `max: None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EffortBracket {
    pub min: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u8>,
    pub max_changed_lines: usize,
}

impl EffortBracket {
    pub fn new(min: u8, max: Option<u8>, max_changed_lines: usize) -> Self {
        Self {
            min,
            max,
            max_changed_lines,
        }
    }

    pub fn contains(&self, effort: u8) -> bool {
        effort >= self.min && self.max.is_none_or(|max| effort <= max)
    }
}

/// Limits applied by `validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ValidationConstraints {
    /// Maximum absolute difference in line count
    #[serde(default = "default_max_line_delta")]
    pub max_line_delta: usize,

    /// Maximum fractional growth (0.5 = the file may grow by at most 50%)
    #[serde(default = "default_max_growth_ratio")]
    pub max_growth_ratio: f64,

    /// Reject removal of a named export or a flip of default-export presence
    #[serde(default = "default_true")]
    pub forbid_export_removal: bool,

    /// Reject removal of an import whose identifier is still referenced
    #[serde(default = "default_true")]
    pub forbid_used_import_removal: bool,

    /// Effort → changed-line limits
    #[serde(default = "default_effort_brackets")]
    pub effort_brackets: Vec<EffortBracket>,
}

fn default_max_line_delta() -> usize {
    100
}

fn default_max_growth_ratio() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_effort_brackets() -> Vec<EffortBracket> {
    vec![
        EffortBracket::new(1, Some(2), 40),
        EffortBracket::new(3, Some(4), 80),
        EffortBracket::new(5, None, 150),
    ]
}

impl Default for ValidationConstraints {
    fn default() -> Self {
        Self {
            max_line_delta: default_max_line_delta(),
            max_growth_ratio: default_max_growth_ratio(),
            forbid_export_removal: true,
            forbid_used_import_removal: true,
            effort_brackets: default_effort_brackets(),
        }
    }
}

impl ValidationConstraints {
    /// Changed-line limit for a declared effort. The first matching bracket
    /// wins; `None` when no bracket covers the effort.
    pub fn limit_for_effort(&self, effort: u8) -> Option<usize> {
        self.effort_brackets
            .iter()
            .find(|b| b.contains(effort))
            .map(|b| b.max_changed_lines)
    }
}
