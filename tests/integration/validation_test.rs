//! Validation Engine Integration Tests
//!
//! Properties of `validate` that the iteration loop relies on:
//! - identical input is always valid, and repeated calls agree
//! - removing a named export is never valid, adding one is
//! - growth beyond the ratio is rejected regardless of the line delta limit
//! - effort brackets bound the line delta

use refine_engine::refine_validation::{
    validate, validate_cross_file, EffortBracket, ValidationConstraints, ViolationKind,
};

use crate::support::{numbered_lines, project};

const BUTTON: &str = "import { clsx } from 'clsx';\n\
import { Icon } from './Icon';\n\
\n\
export const sizes = ['sm', 'md'];\n\
\n\
export function Button({ label }) {\n\
  return <button className={clsx('px-2')}><Icon />{label}</button>;\n\
}\n\
\n\
export default Button;\n";

#[test]
fn test_validation_is_idempotent() {
    let constraints = ValidationConstraints::default();
    let modified = BUTTON.replace("px-2", "px-3");

    let first = validate(BUTTON, &modified, &constraints, Some(2));
    let second = validate(BUTTON, &modified, &constraints, Some(2));
    assert_eq!(first, second);
    assert!(first.valid);
    assert_eq!(first.changed_lines, 1);

    let same = validate(BUTTON, BUTTON, &constraints, Some(1));
    assert!(same.valid);
    assert_eq!(same.changed_lines, 0);
    assert!(same.violations.is_empty());
}

#[test]
fn test_named_export_removal_is_rejected() {
    let constraints = ValidationConstraints::default();
    let removed = BUTTON.replace("export const sizes", "const sizes");

    let result = validate(BUTTON, &removed, &constraints, None);
    assert!(!result.valid);
    assert!(result.exports_changed);
    assert!(result.has_violation(ViolationKind::ExportRemoved));
    assert!(result.violation_messages()[0].contains("sizes"));
}

#[test]
fn test_added_export_is_allowed() {
    let constraints = ValidationConstraints::default();
    let added = BUTTON.replace(
        "export const sizes",
        "export const variants = ['solid'];\nexport const sizes",
    );

    let result = validate(BUTTON, &added, &constraints, None);
    assert!(result.exports_changed);
    assert!(!result.has_violation(ViolationKind::ExportRemoved));
    assert!(result.valid, "{:?}", result.violations);
}

#[test]
fn test_default_export_removal_is_rejected() {
    let constraints = ValidationConstraints::default();
    let modified = BUTTON.replace("export default Button;\n", "");
    let result = validate(BUTTON, &modified, &constraints, None);
    assert!(result.has_violation(ViolationKind::DefaultExportChanged));
    assert!(!result.valid);
}

#[test]
fn test_removed_import_still_used_is_rejected() {
    let constraints = ValidationConstraints::default();
    let modified = BUTTON.replace("import { Icon } from './Icon';\n", "");
    let result = validate(BUTTON, &modified, &constraints, None);
    assert!(result.has_violation(ViolationKind::ImportRemoved));
    assert!(result.imports_changed);
}

#[test]
fn test_growth_bound() {
    let constraints = ValidationConstraints {
        max_line_delta: 1_000,
        ..ValidationConstraints::default()
    };
    let original = numbered_lines(10);

    // 15 lines is exactly +50%.
    let at_limit = numbered_lines(15);
    assert!(validate(&original, &at_limit, &constraints, None).valid);

    let over = numbered_lines(16);
    let result = validate(&original, &over, &constraints, None);
    assert!(!result.valid);
    assert!(result.has_violation(ViolationKind::Growth));
    assert!(!result.has_violation(ViolationKind::LineDelta));
}

#[test]
fn test_line_delta_bound() {
    let constraints = ValidationConstraints {
        max_line_delta: 5,
        max_growth_ratio: 10.0,
        ..ValidationConstraints::default()
    };
    let original = numbered_lines(40);
    let shrunk = numbered_lines(30);
    let result = validate(&original, &shrunk, &constraints, None);
    assert!(result.has_violation(ViolationKind::LineDelta));
    assert_eq!(result.line_delta, -10);
}

#[test]
fn test_effort_brackets_bound_line_delta() {
    let constraints = ValidationConstraints {
        effort_brackets: vec![
            EffortBracket::new(1, Some(3), 2),
            EffortBracket::new(4, None, 10),
        ],
        ..ValidationConstraints::default()
    };
    let original = numbered_lines(20);
    let grown = numbered_lines(23);

    let low = validate(&original, &grown, &constraints, Some(2));
    assert_eq!(low.line_delta, 3);
    assert!(low.has_violation(ViolationKind::EffortExceeded));

    let high = validate(&original, &grown, &constraints, Some(6));
    assert!(high.valid);

    let unchecked = validate(&original, &grown, &constraints, None);
    assert!(unchecked.valid);

    // Rewriting lines in place keeps the line count, so the bracket holds.
    let rewritten: String = original
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i < 3 {
                format!("{} edited\n", line)
            } else {
                format!("{}\n", line)
            }
        })
        .collect();
    let in_place = validate(&original, &rewritten, &constraints, Some(2));
    assert_eq!(in_place.changed_lines, 3);
    assert!(in_place.valid, "{:?}", in_place.violations);
}

#[test]
fn test_cross_file_flags_removed_export_used_by_dependent() {
    let dir = project(&[
        ("src/components/Button.tsx", BUTTON),
        (
            "src/App.tsx",
            "import { sizes } from './components/Button';\nexport default () => sizes.length;\n",
        ),
    ]);
    let modified = BUTTON.replace("export const sizes", "const sizes");

    let result = validate_cross_file(
        std::path::Path::new("src/components/Button.tsx"),
        BUTTON,
        &modified,
        dir.path(),
    );
    assert!(!result.skipped);
    assert!(result.has_high_impact(), "{:?}", result.breaking_changes);
    assert!(result.affected_files.iter().any(|f| f.ends_with("App.tsx")));

    let harmless = BUTTON.replace("px-2", "px-4");
    let result = validate_cross_file(
        std::path::Path::new("src/components/Button.tsx"),
        BUTTON,
        &harmless,
        dir.path(),
    );
    assert!(!result.has_high_impact());
}
