//! Memory Store Integration Tests
//!
//! Memory fed with real change records from the toolkit, persisted under the
//! project state directory and reloaded.

use refine_engine::models::{AttemptStatus, IterationMemory};
use refine_engine::refine_core::Recommendation;
use refine_engine::refine_toolkit::MutationToolkit;
use refine_engine::services::memory::DuplicateKind;
use refine_engine::utils::default_memory_path;

use crate::support::project;

fn contrast() -> Recommendation {
    Recommendation::new(
        "accessibility",
        "Increase contrast",
        "`text-gray-400` -> `text-gray-700`",
    )
    .with_component("Header")
}

#[test]
fn test_memory_survives_save_and_load() {
    let dir = project(&[(
        "src/Header.tsx",
        "<h1 className=\"text-gray-400\">Acme</h1>\n<p className=\"text-gray-400\">Tagline</p>\n",
    )]);
    let mut toolkit = MutationToolkit::new(dir.path());
    let records = vec![
        toolkit.set_line_token("src/Header.tsx", 1, "text-gray-400", "text-gray-700"),
        toolkit.set_line_token("src/Header.tsx", 2, "text-gray-400", "text-gray-700"),
        toolkit.set_line_token("src/Header.tsx", 2, "text-gray-400", "text-gray-700"),
    ];

    let mut memory = IterationMemory::default();
    let status = memory.record_attempt(&contrast(), 1, AttemptStatus::Success, "applied", &records);
    assert_eq!(status, AttemptStatus::Success);
    memory.record_score(1, 6.0, 6.4);

    // Only the two successful records become file changes.
    assert_eq!(memory.successful_changes.len(), 2);
    assert_eq!(memory.attempted[0].files_modified, vec!["src/Header.tsx".to_string()]);
    assert_eq!(memory.context.component_modifications.get("Header"), Some(&1));

    let path = default_memory_path(dir.path());
    assert!(path.ends_with(".refine/memory.json"));
    memory.save(&path).unwrap();

    let loaded = IterationMemory::load_or_default(&path).unwrap();
    assert_eq!(loaded, memory);
    assert_eq!(loaded.latest_score(), Some(6.4));

    let summary = loaded.context_summary();
    assert!(summary.starts_with("Score: 6.00 -> 6.40 over 1 iteration(s)"));
    assert!(summary.contains("- [accessibility] Increase contrast (src/Header.tsx)"));
    assert!(summary.contains("Component modifications: Header x1"));
}

#[test]
fn test_missing_memory_file_starts_empty() {
    let dir = project(&[]);
    let memory = IterationMemory::load_or_default(&default_memory_path(dir.path())).unwrap();
    assert!(memory.attempted.is_empty());
    assert_eq!(memory.context_summary(), "No previous iterations.");
}

#[test]
fn test_repeated_failures_mark_duplicates() {
    let mut memory = IterationMemory::default();
    for iteration in 1..=3 {
        memory.record_attempt(
            &contrast(),
            iteration,
            AttemptStatus::Failed,
            "validation rejected every change",
            &[],
        );
        memory.record_score(iteration, 5.0, 5.0);
    }

    assert_eq!(memory.failures.len(), 3);
    assert!(memory.successful_changes.is_empty());
    assert_eq!(memory.duplicate_kind(&contrast()), Some(DuplicateKind::Exact));

    // Same words, different punctuation and case.
    let reworded = Recommendation::new("Accessibility", "increase   contrast!", "")
        .with_component("Header");
    assert!(memory.is_duplicate(&reworded));

    // Another component is a different recommendation.
    let footer = Recommendation::new("accessibility", "Increase contrast", "")
        .with_component("Footer");
    assert!(!memory.is_duplicate(&footer));

    assert!(memory.is_plateaued(3));
    let summary = memory.context_summary();
    assert!(summary.contains("Do not repeat:"));
    assert!(summary.contains("Low-improvement streak: 3 iteration(s)."));
}

#[test]
fn test_component_modifications_never_decrease() {
    let dir = project(&[("src/Nav.tsx", "<nav className=\"gap-1 p-1\">x</nav>\n")]);
    let mut toolkit = MutationToolkit::new(dir.path());
    let mut memory = IterationMemory::default();
    let nav = |title: &str| Recommendation::new("layout", title, "").with_component("Nav");

    let mut previous = 0;
    let steps = [
        ("gap-1", "gap-2", AttemptStatus::Success),
        ("p-1", "p-2", AttemptStatus::BrokeBuild),
        ("gap-2", "gap-3", AttemptStatus::Success),
    ];
    for (i, (from, to, status)) in steps.into_iter().enumerate() {
        let record = toolkit.set_line_token("src/Nav.tsx", 1, from, to);
        memory.record_attempt(&nav(&format!("step {}", i)), i as u32 + 1, status, "", &[record]);
        let count = memory.modification_count("Nav");
        assert!(count >= previous);
        previous = count;
    }
    assert_eq!(memory.modification_count("Nav"), 2);
    assert_eq!(memory.context.component_attempts.get("Nav"), Some(&3));
}
