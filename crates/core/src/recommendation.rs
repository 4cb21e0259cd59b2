//! Recommendation Model
//!
//! A recommendation is opaque text plus two numeric hints. The engine only
//! reads `effort` (line-limit bracket selection) and uses the text fields for
//! candidate-file discovery and duplicate suppression.

use serde::{Deserialize, Serialize};

/// A prioritized recommendation supplied by the recommendation source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Optional stable identifier assigned by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Scoring dimension this recommendation targets (e.g. "accessibility")
    pub dimension: String,
    /// Short title
    pub title: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Expected impact, 1-10
    #[serde(default = "default_hint")]
    pub impact: u8,
    /// Expected effort, 1-10
    #[serde(default = "default_hint")]
    pub effort: u8,
    /// Target UI component, when the source names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_component: Option<String>,
    /// Explicit candidate files (relative to the project root)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_files: Vec<String>,
}

fn default_hint() -> u8 {
    5
}

impl Recommendation {
    /// Create a recommendation with default hints.
    pub fn new(
        dimension: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            dimension: dimension.into(),
            title: title.into(),
            description: description.into(),
            impact: default_hint(),
            effort: default_hint(),
            target_component: None,
            target_files: Vec::new(),
        }
    }

    /// Set the impact and effort hints (clamped to 1-10).
    pub fn with_hints(mut self, impact: u8, effort: u8) -> Self {
        self.impact = impact.clamp(1, 10);
        self.effort = effort.clamp(1, 10);
        self
    }

    /// Set the target component.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.target_component = Some(component.into());
        self
    }

    /// Add an explicit candidate file.
    pub fn with_target_file(mut self, path: impl Into<String>) -> Self {
        self.target_files.push(path.into());
        self
    }

    /// Keywords used for candidate-file discovery.
    ///
    /// Lowercased words of at least three characters from the title,
    /// description and component, with duplicates removed in first-seen order.
    pub fn keywords(&self) -> Vec<String> {
        let mut seen = Vec::new();
        let sources = [
            self.title.as_str(),
            self.description.as_str(),
            self.target_component.as_deref().unwrap_or(""),
        ];
        for source in sources {
            for word in source
                .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
                .filter(|w| w.chars().count() >= 3)
            {
                let word = word.to_lowercase();
                if !STOP_WORDS.contains(&word.as_str()) && !seen.contains(&word) {
                    seen.push(word);
                }
            }
        }
        seen
    }
}

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "into", "make", "use", "more", "less",
    "should", "change", "update", "improve", "increase", "decrease",
];
