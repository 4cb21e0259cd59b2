//! Mutation Toolkit Integration Tests
//!
//! - Single-token edit leaves every other byte of the file untouched
//! - Fallback search resolves within ±window and refuses beyond it
//! - Failed operations leave files byte-identical and are still logged

use refine_engine::refine_toolkit::{
    ErrorKind, MutationOperation, MutationToolkit, OperationKind, DEFAULT_FALLBACK_WINDOW,
};

use crate::support::{project, read};

const CARD: &str = concat!(
    "import React from 'react';\n",
    "\n",
    "export function Card() {\n",
    "  return <p className=\"text-sm text-gray-600\">Details</p>;\n",
    "}\n",
    "\n",
    "export const cardTitle = 'Card';\n",
    "\n",
    "// end\n",
    "export default Card;\n",
);

#[test]
fn test_token_swap_on_requested_line_changes_only_that_span() {
    let dir = project(&[("src/Card.tsx", CARD)]);
    let mut toolkit = MutationToolkit::new(dir.path());

    let record = toolkit.set_line_token("src/Card.tsx", 4, "text-sm", "text-base");

    assert!(record.success, "{:?}", record.error);
    assert_eq!(record.resolved_line, Some(4));
    assert_eq!(record.line_offset, 0);
    assert_eq!(
        record.line_after.as_deref(),
        Some("  return <p className=\"text-base text-gray-600\">Details</p>;")
    );

    let after = read(dir.path(), "src/Card.tsx");
    assert_eq!(after, CARD.replacen("text-sm", "text-base", 1));
    let changed: Vec<usize> = CARD
        .lines()
        .zip(after.lines())
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| i + 1)
        .collect();
    assert_eq!(changed, vec![4]);
}

#[test]
fn test_fallback_window_boundary() {
    let mut lines: Vec<String> = (1..=20).map(|i| format!("<div>{}</div>", i)).collect();
    lines[8] = "<div className=\"gap-1\">9</div>".to_string();
    let content = lines.join("\n") + "\n";
    let dir = project(&[("src/List.tsx", &content)]);
    let mut toolkit = MutationToolkit::new(dir.path());
    assert_eq!(toolkit.fallback_window(), DEFAULT_FALLBACK_WINDOW);

    // Requested line 4, value on line 9: exactly +5.
    let record = toolkit.set_line_token("src/List.tsx", 4, "gap-1", "gap-2");
    assert!(record.success);
    assert_eq!(record.resolved_line, Some(9));
    assert_eq!(record.line_offset, 5);

    // Requested line 3, value on line 9: +6 is outside the window.
    let before = read(dir.path(), "src/List.tsx");
    let record = toolkit.set_line_token("src/List.tsx", 3, "gap-2", "gap-3");
    assert!(!record.success);
    assert_eq!(record.error_kind, Some(ErrorKind::TokenNotFound));
    assert_eq!(read(dir.path(), "src/List.tsx"), before);
}

#[test]
fn test_wider_window_reaches_further() {
    let mut lines: Vec<String> = (1..=20).map(|i| format!("row {}", i)).collect();
    lines[14] = "row accent".to_string();
    let content = lines.join("\n") + "\n";
    let dir = project(&[("notes.html", &content)]);
    let mut toolkit = MutationToolkit::new(dir.path()).with_fallback_window(10);

    let record = toolkit.set_line_token("notes.html", 6, "accent", "primary");
    assert!(record.success);
    assert_eq!(record.resolved_line, Some(15));
    assert_eq!(record.line_offset, 9);
}

#[test]
fn test_failures_are_atomic_and_logged() {
    let dir = project(&[("src/Card.tsx", CARD)]);
    let mut toolkit = MutationToolkit::new(dir.path());

    let attempts = [
        MutationOperation::set_line_token("src/Card.tsx", 4, "text-xs", "text-sm"),
        MutationOperation::set_line_token("src/Card.tsx", 40, "text-sm", "text-base"),
        MutationOperation::append_token("src/Card.tsx", 4, "text-sm", "text-gray-600"),
        MutationOperation::set_text_run("../outside.txt", 1, "a", "b"),
        MutationOperation::set_text_run("src/Missing.tsx", 1, "a", "b"),
    ];
    for op in &attempts {
        let record = toolkit.apply(op);
        assert!(!record.success, "{} should fail", op.describe());
        assert!(record.error.is_some());
        assert_eq!(read(dir.path(), "src/Card.tsx"), CARD);
    }

    let stats = toolkit.stats();
    assert_eq!(stats.total, attempts.len());
    assert_eq!(stats.succeeded, 0);
    assert_eq!(stats.failed, attempts.len());
    assert_eq!(stats.by_error.get(&ErrorKind::TokenNotFound), Some(&1));
    assert_eq!(stats.by_error.get(&ErrorKind::LineOutOfRange), Some(&1));
    assert_eq!(stats.by_error.get(&ErrorKind::AlreadyPresent), Some(&1));
    assert_eq!(stats.by_error.get(&ErrorKind::InvalidPath), Some(&1));
    assert!(toolkit.log().touched_files().is_empty());
}

#[test]
fn test_mixed_session_statistics() {
    let dir = project(&[
        ("src/Card.tsx", CARD),
        ("src/app.css", ".card {\n  padding: 8px;\n  color: #333;\n}\n"),
    ]);
    let mut toolkit = MutationToolkit::new(dir.path());

    assert!(toolkit.set_line_token("src/Card.tsx", 4, "text-sm", "text-base").success);
    assert!(toolkit.append_token("src/Card.tsx", 4, "text-base", "font-medium").success);
    assert!(toolkit.set_property_value("src/app.css", 2, "padding", "8px", "12px").success);
    assert!(toolkit.set_text_run("src/Card.tsx", 4, "Details", "More details").success);
    assert!(!toolkit.set_text_run("src/Card.tsx", 4, "Summary", "Overview").success);

    assert_eq!(
        read(dir.path(), "src/app.css"),
        ".card {\n  padding: 12px;\n  color: #333;\n}\n"
    );
    assert!(read(dir.path(), "src/Card.tsx")
        .contains("className=\"text-base font-medium text-gray-600\">More details</p>"));

    let stats = toolkit.stats();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.succeeded, 4);
    assert_eq!(stats.by_kind[&OperationKind::SetTextRun].total, 2);
    assert_eq!(stats.by_kind[&OperationKind::SetTextRun].failed, 1);
    assert_eq!(
        toolkit.log().touched_files(),
        vec!["src/Card.tsx".to_string(), "src/app.css".to_string()]
    );
}
