//! Duplicate Detection
//!
//! Two rules, applied against prior `failed`/`no_effect` attempts:
//!
//! - exact: same dimension, normalized title (or description) equal, and the
//!   same component when both name one
//! - near: same dimension and component, the component modified more than
//!   `near_duplicate_threshold` times, and no net score gain across the
//!   iterations that modified it

use std::collections::BTreeSet;

use refine_core::Recommendation;
use serde::{Deserialize, Serialize};

use crate::models::{AttemptStatus, AttemptedRecommendation, IterationMemory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    Exact,
    Near,
}

impl std::fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateKind::Exact => write!(f, "exact duplicate"),
            DuplicateKind::Near => write!(f, "near duplicate"),
        }
    }
}

/// Lowercase, punctuation stripped, whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Component a recommendation is attributed to: the explicit target
/// component, else the stem of its first target file.
pub(crate) fn component_of(rec: &Recommendation, files: &[String]) -> Option<String> {
    if let Some(component) = rec.target_component.as_deref().map(str::trim) {
        if !component.is_empty() {
            return Some(component.to_string());
        }
    }
    rec.target_files
        .iter()
        .chain(files.iter())
        .find_map(|f| {
            std::path::Path::new(f)
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
}

fn same_component(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => true,
    }
}

fn is_exact(prior: &AttemptedRecommendation, rec: &Recommendation, component: Option<&str>) -> bool {
    if !prior.recommendation.dimension.eq_ignore_ascii_case(&rec.dimension) {
        return false;
    }
    if !same_component(prior.component.as_deref(), component) {
        return false;
    }
    let title = normalize_text(&rec.title);
    let description = normalize_text(&rec.description);
    (!title.is_empty() && title == normalize_text(&prior.recommendation.title))
        || (!description.is_empty()
            && description == normalize_text(&prior.recommendation.description))
}

pub(crate) fn find_duplicate(memory: &IterationMemory, rec: &Recommendation) -> Option<DuplicateKind> {
    let component = component_of(rec, &[]);
    let unproductive: Vec<&AttemptedRecommendation> = memory
        .attempted
        .iter()
        .filter(|a| a.status.is_unproductive())
        .collect();

    if unproductive
        .iter()
        .any(|prior| is_exact(prior, rec, component.as_deref()))
    {
        return Some(DuplicateKind::Exact);
    }

    let component = component?;
    let related_failure = unproductive.iter().any(|prior| {
        prior.recommendation.dimension.eq_ignore_ascii_case(&rec.dimension)
            && prior
                .component
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(&component))
    });
    if !related_failure {
        return None;
    }

    let modifications = memory
        .context
        .component_modifications
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(&component))
        .map(|(_, n)| *n)
        .unwrap_or(0);
    if modifications <= memory.settings.near_duplicate_threshold {
        return None;
    }

    let iterations: BTreeSet<u32> = memory
        .attempted
        .iter()
        .filter(|a| {
            a.status == AttemptStatus::Success
                && a.component
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(&component))
        })
        .map(|a| a.iteration)
        .collect();
    let net_gain: f64 = memory
        .score_history
        .iter()
        .filter(|s| iterations.contains(&s.iteration))
        .map(|s| s.delta)
        .sum();

    (net_gain <= 0.0).then_some(DuplicateKind::Near)
}
