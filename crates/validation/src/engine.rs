//! Single-File Validation
//!
//! `validate(original, modified, constraints, effort)` computes size metrics
//! and interface diffs for one file and lists every violated constraint.
//! Checks are pure functions of the two texts, so `validate(x, x, ..)` is
//! always valid with zero delta.

use std::collections::BTreeSet;

use similar::{ChangeTag, TextDiff};

use crate::constraints::ValidationConstraints;
use crate::interface::{extract_exports, extract_imports, identifier_referenced, ImportStatement};
use crate::models::{ValidationResult, Violation, ViolationKind};

/// Number of lines touched by the edit: the larger of inserted and deleted
/// lines in a line diff. Always at least `|line_delta|`.
pub fn changed_line_count(original: &str, modified: &str) -> usize {
    let diff = TextDiff::from_lines(original, modified);
    let (mut inserted, mut deleted) = (0usize, 0usize);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => inserted += 1,
            ChangeTag::Delete => deleted += 1,
            ChangeTag::Equal => {}
        }
    }
    inserted.max(deleted)
}

fn growth_ratio(original_lines: usize, modified_lines: usize) -> f64 {
    if original_lines == 0 {
        return modified_lines as f64;
    }
    (modified_lines as f64 - original_lines as f64) / original_lines as f64
}

/// Identifier → bound by which statement, for every import binding.
fn import_bindings(imports: &[ImportStatement]) -> BTreeSet<(String, String)> {
    imports
        .iter()
        .flat_map(|stmt| {
            stmt.locals()
                .into_iter()
                .map(move |local| (local.to_string(), stmt.source.clone()))
        })
        .collect()
}

fn side_effect_sources(imports: &[ImportStatement]) -> BTreeSet<String> {
    imports
        .iter()
        .filter(|s| s.side_effect)
        .map(|s| s.source.clone())
        .collect()
}

/// Validate a modified file against its original.
///
/// `effort` is the recommendation's 1-10 effort hint; `None` skips the
/// effort-bracket check.
pub fn validate(
    original: &str,
    modified: &str,
    constraints: &ValidationConstraints,
    effort: Option<u8>,
) -> ValidationResult {
    let original_line_count = original.lines().count();
    let modified_line_count = modified.lines().count();
    let line_delta = modified_line_count as i64 - original_line_count as i64;
    let changed_lines = changed_line_count(original, modified);

    let mut result = ValidationResult {
        file: None,
        valid: true,
        original_line_count,
        modified_line_count,
        line_delta,
        growth_ratio: growth_ratio(original_line_count, modified_line_count),
        changed_lines,
        exports_changed: false,
        imports_changed: false,
        violations: Vec::new(),
    };

    // Size
    if line_delta.unsigned_abs() as usize > constraints.max_line_delta {
        result.push_violation(Violation::new(
            ViolationKind::LineDelta,
            format!(
                "Line count changed by {} (limit ±{})",
                line_delta, constraints.max_line_delta
            ),
        ));
    }

    let growth_limit = original_line_count as f64 * (1.0 + constraints.max_growth_ratio);
    if modified_line_count as f64 > growth_limit {
        result.push_violation(Violation::new(
            ViolationKind::Growth,
            format!(
                "File grew from {} to {} lines ({:+.0}%, limit {:.0}%)",
                original_line_count,
                modified_line_count,
                result.growth_ratio * 100.0,
                constraints.max_growth_ratio * 100.0
            ),
        ));
    }

    if let Some(effort) = effort {
        if let Some(limit) = constraints.limit_for_effort(effort) {
            if line_delta.unsigned_abs() as usize > limit {
                result.push_violation(Violation::new(
                    ViolationKind::EffortExceeded,
                    format!(
                        "Line count changed by {} which exceeds the limit of {} for effort {}",
                        line_delta, limit, effort
                    ),
                ));
            }
        }
    }

    // Exports
    let before = extract_exports(original);
    let after = extract_exports(modified);
    result.exports_changed = before != after;

    if constraints.forbid_export_removal {
        if before.has_default != after.has_default {
            let message = if before.has_default {
                "Default export was removed"
            } else {
                "Default export was added where none existed"
            };
            result.push_violation(Violation::new(ViolationKind::DefaultExportChanged, message));
        }
        let removed: Vec<String> = before.removed_in(&after).cloned().collect();
        for name in removed {
            result.push_violation(Violation::new(
                ViolationKind::ExportRemoved,
                format!("Named export '{}' was removed", name),
            ));
        }
    }

    // Imports
    let imports_before = extract_imports(original);
    let imports_after = extract_imports(modified);
    let bindings_before = import_bindings(&imports_before);
    let bindings_after = import_bindings(&imports_after);
    result.imports_changed = bindings_before != bindings_after
        || side_effect_sources(&imports_before) != side_effect_sources(&imports_after);

    if constraints.forbid_used_import_removal {
        let still_bound: BTreeSet<&String> = bindings_after.iter().map(|(local, _)| local).collect();
        let mut reported = BTreeSet::new();
        for (local, source) in &bindings_before {
            if still_bound.contains(local) || !reported.insert(local.clone()) {
                continue;
            }
            if identifier_referenced(modified, local) {
                result.push_violation(Violation::new(
                    ViolationKind::ImportRemoved,
                    format!(
                        "Import '{}' from '{}' was removed but is still used",
                        local, source
                    ),
                ));
            }
        }
    }

    result
}
