//! Iteration Control Loop Integration Tests
//!
//! Full runs against a temporary project with in-process collaborators:
//! - plateau detection over low-delta iterations
//! - rollback after a failed build restores every touched file
//! - duplicate recommendations are skipped while proposing
//! - validation failures roll back only the offending file
//! - consecutive rollbacks end the run
//! - breaking a dependent's props is caught by the cross-file check
//! - a build check that outlives the phase timeout triggers a rollback

use std::time::Duration;

use tokio::sync::mpsc;

use refine_engine::models::{AttemptStatus, IterationMemory, IterationOutcome, StopReason};
use refine_engine::refine_core::Recommendation;
use refine_engine::refine_validation::{ValidationConstraints, ViolationKind};
use refine_engine::services::iteration::{
    run_single, Collaborators, IterationEvent, IterationInput, IterationLoop,
    IterationLoopConfig, IterationServices, IterationStep,
};
use refine_engine::services::memory::DuplicateKind;
use refine_engine::services::plan::LiteralSwapProposer;
use refine_engine::services::recommendation::QueueRecommendationSource;
use refine_engine::RefineConfig;

use crate::support::{
    project, read, BrokenScorer, FixedBuild, FixedVisual, SequenceScorer, SlowBuild,
};

const APP: &str = "export default function App() {\n\
  return (\n\
    <main className=\"p-2\">\n\
      <h1 className=\"text-sm\">Title</h1>\n\
      <p className=\"gap-1\">Body</p>\n\
      <button className=\"rounded\">Go</button>\n\
    </main>\n\
  );\n\
}\n";

fn swap(title: &str, from: &str, to: &str) -> Recommendation {
    Recommendation::new("visual", title, format!("`{}` -> `{}`", from, to))
        .with_hints(5, 2)
        .with_target_file("src/App.tsx")
}

fn collaborators(
    recommendations: Vec<Recommendation>,
    build_passes: bool,
    scores: &[f64],
) -> Collaborators {
    Collaborators {
        source: Box::new(QueueRecommendationSource::from_vec(recommendations)),
        proposer: Box::new(LiteralSwapProposer::default()),
        build: Box::new(FixedBuild { pass: build_passes }),
        visual: None,
        scorer: Box::new(SequenceScorer::new(scores)),
    }
}

fn drain(rx: &mut mpsc::Receiver<IterationEvent>) -> Vec<IterationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_low_deltas_plateau_on_third_iteration() {
    let dir = project(&[("src/App.tsx", APP)]);
    let recommendations = vec![
        swap("Larger heading", "text-sm", "text-base"),
        swap("Looser body", "gap-1", "gap-2"),
        swap("Softer button", "rounded", "rounded-lg"),
        swap("More padding", "p-2", "p-4"),
    ];
    let config = IterationLoopConfig::new(dir.path());
    let mut engine = IterationLoop::new(
        config,
        collaborators(recommendations, true, &[5.0, 5.02, 5.03, 5.06]),
    );

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::Plateaued);
    assert_eq!(summary.iterations.len(), 3);
    assert_eq!(summary.initial_score, 5.0);
    assert_eq!(summary.final_score, 5.06);
    let deltas: Vec<f64> = summary.iterations.iter().map(|r| r.delta).collect();
    assert_eq!(deltas, vec![0.02, 0.01, 0.03]);
    assert_eq!(summary.iterations[0].outcome, IterationOutcome::Continue);
    assert_eq!(summary.iterations[2].outcome, IterationOutcome::Plateaued);
    assert!(summary
        .iterations
        .iter()
        .all(|r| r.status == AttemptStatus::Success));

    let app = read(dir.path(), "src/App.tsx");
    assert!(app.contains("className=\"text-base\""));
    assert!(app.contains("className=\"gap-2\""));
    assert!(app.contains("className=\"rounded-lg\""));
    // The fourth recommendation was never reached.
    assert!(app.contains("className=\"p-2\""));

    let memory = engine.memory();
    assert_eq!(memory.score_history.len(), 3);
    assert_eq!(memory.successful_changes.len(), 3);
    assert!(memory.is_plateaued(3));
}

#[tokio::test]
async fn test_build_failure_restores_every_touched_file() {
    let header = "<header className=\"text-sm\">\n  <h1 className=\"text-sm font-bold\">Acme</h1>\n</header>\n";
    let footer = "<footer>\n  <small className=\"text-sm\">(c)</small>\n  <a className=\"text-sm\">Terms</a>\n</footer>\n";
    let untouched = "export const unrelated = true;\n";
    let dir = project(&[
        ("src/Header.tsx", header),
        ("src/Footer.tsx", footer),
        ("src/util.ts", untouched),
    ]);

    let rec = Recommendation::new("typography", "Larger text", "`text-sm` -> `text-base`");
    let mut engine = IterationLoop::new(
        IterationLoopConfig::new(dir.path()),
        collaborators(vec![rec], false, &[6.0]),
    );

    let IterationStep::Completed(report) = engine.run_once().await.unwrap() else {
        panic!("expected a completed iteration");
    };

    let applied = report.change_records.iter().filter(|r| r.success).count();
    assert_eq!(applied, 4);
    assert_eq!(report.status, AttemptStatus::BrokeBuild);
    assert_eq!(report.outcome, IterationOutcome::Failed);
    assert!(!report.fatal);
    let mut rolled_back = report.rolled_back.clone();
    rolled_back.sort();
    assert_eq!(
        rolled_back,
        vec!["src/Footer.tsx".to_string(), "src/Header.tsx".to_string()]
    );
    assert!(report.committed.is_empty());

    assert_eq!(read(dir.path(), "src/Header.tsx"), header);
    assert_eq!(read(dir.path(), "src/Footer.tsx"), footer);
    assert_eq!(read(dir.path(), "src/util.ts"), untouched);

    let memory = engine.memory();
    assert_eq!(memory.attempted.len(), 1);
    assert_eq!(memory.attempted[0].status, AttemptStatus::BrokeBuild);
    assert!(memory.attempted[0].files_modified.is_empty());
    assert!(memory.successful_changes.is_empty());
    assert!(memory.score_history.is_empty());
}

#[tokio::test]
async fn test_visual_failure_rolls_back() {
    let dir = project(&[("src/App.tsx", APP)]);
    let mut collab = collaborators(
        vec![swap("Larger heading", "text-sm", "text-base")],
        true,
        &[5.0],
    );
    collab.visual = Some(Box::new(FixedVisual { pass: false }));
    let mut engine = IterationLoop::new(IterationLoopConfig::new(dir.path()), collab);

    let IterationStep::Completed(report) = engine.run_once().await.unwrap() else {
        panic!("expected a completed iteration");
    };
    assert_eq!(report.status, AttemptStatus::BrokeBuild);
    assert!(report.build.as_ref().is_some_and(|b| b.success));
    assert!(report.visual.as_ref().is_some_and(|v| !v.success));
    assert!(report.reason.contains("hydration mismatch"));
    assert_eq!(read(dir.path(), "src/App.tsx"), APP);
}

#[tokio::test]
async fn test_scorer_failure_rolls_back() {
    let dir = project(&[("src/App.tsx", APP)]);
    let mut collab = collaborators(
        vec![swap("Larger heading", "text-sm", "text-base")],
        true,
        &[],
    );
    collab.scorer = Box::new(BrokenScorer::after_baseline(5.0));
    let mut engine = IterationLoop::new(IterationLoopConfig::new(dir.path()), collab);

    let IterationStep::Completed(report) = engine.run_once().await.unwrap() else {
        panic!("expected a completed iteration");
    };
    assert_eq!(report.status, AttemptStatus::Failed);
    assert!(report.reason.starts_with("scoring failed"));
    assert_eq!(report.rolled_back, vec!["src/App.tsx".to_string()]);
    assert_eq!(read(dir.path(), "src/App.tsx"), APP);
    assert!(engine.memory().score_history.is_empty());
}

#[tokio::test]
async fn test_baseline_failure_aborts_run() {
    let dir = project(&[("src/App.tsx", APP)]);
    let mut collab = collaborators(
        vec![swap("Larger heading", "text-sm", "text-base")],
        true,
        &[],
    );
    collab.scorer = Box::new(BrokenScorer::always());
    let mut engine = IterationLoop::new(IterationLoopConfig::new(dir.path()), collab);

    assert!(engine.run().await.is_err());
    assert_eq!(read(dir.path(), "src/App.tsx"), APP);
}

#[tokio::test]
async fn test_empty_plan_is_no_effect_without_scoring() {
    let dir = project(&[("src/App.tsx", APP)]);
    let scorer = SequenceScorer::new(&[5.0, 7.0]);
    let calls = scorer.calls();
    let rec = Recommendation::new("visual", "Make it pop", "Feels flat").with_target_file("src/App.tsx");
    let mut collab = collaborators(vec![rec], true, &[]);
    collab.scorer = Box::new(scorer);
    let mut engine = IterationLoop::new(IterationLoopConfig::new(dir.path()), collab);

    let IterationStep::Completed(report) = engine.run_once().await.unwrap() else {
        panic!("expected a completed iteration");
    };
    assert_eq!(report.status, AttemptStatus::NoEffect);
    assert_eq!(report.delta, 0.0);
    assert_eq!(report.outcome, IterationOutcome::Continue);
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(read(dir.path(), "src/App.tsx"), APP);
    assert_eq!(engine.memory().plateau_counter, 1);
}

#[tokio::test]
async fn test_duplicate_recommendation_is_skipped_while_proposing() {
    let dir = project(&[("src/Header.tsx", "<h1 className=\"text-gray-400\">Acme</h1>\n")]);
    let contrast = Recommendation::new(
        "accessibility",
        "Increase contrast",
        "`text-gray-400` -> `text-gray-700`",
    )
    .with_component("Header");

    let mut memory = IterationMemory::default();
    for iteration in 1..=3 {
        memory.record_attempt(
            &contrast,
            iteration,
            AttemptStatus::Failed,
            "validation rejected every change",
            &[],
        );
        memory.record_score(iteration, 5.0, 5.0);
    }

    let fresh = Recommendation::new("typography", "Bolder heading", "`text-gray-400` -> `text-gray-900`")
        .with_target_file("src/Header.tsx");
    let (tx, mut rx) = mpsc::channel(64);
    let mut engine = IterationLoop::new(
        IterationLoopConfig::new(dir.path()),
        collaborators(vec![contrast.clone(), fresh], true, &[6.0]),
    )
    .with_memory(memory)
    .with_events(tx);

    let IterationStep::Completed(report) = engine.run_once().await.unwrap() else {
        panic!("expected a completed iteration");
    };

    assert_eq!(report.iteration, 4);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].title, "Increase contrast");
    assert_eq!(report.skipped[0].reason, DuplicateKind::Exact.to_string());
    assert_eq!(
        report.recommendation.as_ref().map(|r| r.title.as_str()),
        Some("Bolder heading")
    );
    assert_eq!(report.status, AttemptStatus::Success);
    assert_eq!(
        read(dir.path(), "src/Header.tsx"),
        "<h1 className=\"text-gray-900\">Acme</h1>\n"
    );

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        IterationEvent::DuplicateSkipped { iteration: 4, kind: DuplicateKind::Exact, .. }
    )));
    // The duplicate was never recorded as a fourth attempt.
    let contrast_attempts = engine
        .memory()
        .attempted
        .iter()
        .filter(|a| a.recommendation.title == "Increase contrast")
        .count();
    assert_eq!(contrast_attempts, 3);
}

#[tokio::test]
async fn test_invalid_file_is_restored_and_valid_file_kept() {
    let theme = "export const primary = 'blue';\nexport const muted = 'gray';\n";
    let button = "export function Button() {\n  return <button className=\"primary\">Go</button>;\n}\n";
    let dir = project(&[("src/theme.ts", theme), ("src/Button.tsx", button)]);

    let rec = Recommendation::new("visual", "Accent buttons", "`primary` -> `accent`")
        .with_target_file("src/theme.ts")
        .with_target_file("src/Button.tsx");
    let mut config = IterationLoopConfig::new(dir.path());
    config.loop_config.cross_file_check = false;
    let mut engine = IterationLoop::new(config, collaborators(vec![rec], true, &[5.0, 5.5]));

    let IterationStep::Completed(report) = engine.run_once().await.unwrap() else {
        panic!("expected a completed iteration");
    };

    assert_eq!(report.rolled_back, vec!["src/theme.ts".to_string()]);
    assert_eq!(report.committed, vec!["src/Button.tsx".to_string()]);
    assert_eq!(report.status, AttemptStatus::Success);
    assert_eq!(report.delta, 0.5);
    assert_eq!(read(dir.path(), "src/theme.ts"), theme);
    assert!(read(dir.path(), "src/Button.tsx").contains("className=\"accent\""));

    let invalid = report
        .validations
        .iter()
        .find(|v| v.file.as_deref() == Some("src/theme.ts"))
        .unwrap();
    assert!(!invalid.valid);

    // Only the kept file's change is remembered.
    let memory = engine.memory();
    assert_eq!(memory.successful_changes.len(), 1);
    assert_eq!(memory.successful_changes[0].file, "src/Button.tsx");
}

#[tokio::test]
async fn test_removed_prop_used_by_dependent_is_rolled_back() {
    let button = concat!(
        "export interface ButtonProps {\n",
        "  variant: string;\n",
        "}\n",
        "\n",
        "export function Button({ variant }: ButtonProps) {\n",
        "  return <button className={variant}>Go</button>;\n",
        "}\n",
    );
    let home = concat!(
        "import { Button } from '../components/Button';\n",
        "\n",
        "export default function Home() {\n",
        "  return <Button variant=\"primary\" />;\n",
        "}\n",
    );
    let dir = project(&[
        ("src/components/Button.tsx", button),
        ("src/pages/Home.tsx", home),
    ]);

    let rec = Recommendation::new("api", "Rename variant", "`variant: string;` -> `tone: string;`")
        .with_hints(5, 2)
        .with_target_file("src/components/Button.tsx");
    let (tx, mut rx) = mpsc::channel(64);
    let mut engine = IterationLoop::new(
        IterationLoopConfig::new(dir.path()),
        collaborators(vec![rec], true, &[5.0]),
    )
    .with_events(tx);

    let IterationStep::Completed(report) = engine.run_once().await.unwrap() else {
        panic!("expected a completed iteration");
    };

    assert_eq!(report.change_records.iter().filter(|r| r.success).count(), 1);
    assert_eq!(report.status, AttemptStatus::Failed);
    assert_eq!(report.rolled_back, vec!["src/components/Button.tsx".to_string()]);
    assert!(report.committed.is_empty());
    assert_eq!(read(dir.path(), "src/components/Button.tsx"), button);
    assert_eq!(read(dir.path(), "src/pages/Home.tsx"), home);

    let validation = &report.validations[0];
    assert!(validation.has_violation(ViolationKind::CrossFileBreaking));
    // The single-file checks alone would have accepted the edit.
    assert_eq!(validation.violations.len(), 1);

    let cross = &report.cross_file[0];
    assert_eq!(cross.file, "src/components/Button.tsx");
    assert!(cross.result.has_high_impact());
    assert_eq!(cross.result.affected_files, vec!["src/pages/Home.tsx".to_string()]);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        IterationEvent::ValidationFailed { file, .. } if file == "src/components/Button.tsx"
    )));
    assert!(engine.memory().successful_changes.is_empty());
}

#[tokio::test]
async fn test_build_timeout_counts_as_verification_failure() {
    let dir = project(&[("src/App.tsx", APP)]);
    let mut collab = collaborators(
        vec![swap("Larger heading", "text-sm", "text-base")],
        true,
        &[5.0, 6.0],
    );
    collab.build = Box::new(SlowBuild {
        delay: Duration::from_secs(30),
    });
    let mut config = IterationLoopConfig::new(dir.path());
    config.loop_config.phase_timeout_secs = 1;
    let mut engine = IterationLoop::new(config, collab);

    let IterationStep::Completed(report) = engine.run_once().await.unwrap() else {
        panic!("expected a completed iteration");
    };

    assert_eq!(report.status, AttemptStatus::BrokeBuild);
    assert!(!report.fatal);
    assert!(report.reason.starts_with("verification timed out"), "{}", report.reason);
    assert!(report.build.is_none());
    assert_eq!(report.rolled_back, vec!["src/App.tsx".to_string()]);
    assert_eq!(read(dir.path(), "src/App.tsx"), APP);

    let memory = engine.memory();
    assert_eq!(memory.attempted[0].status, AttemptStatus::BrokeBuild);
    assert!(memory.score_history.is_empty());
}

#[tokio::test]
async fn test_consecutive_rollbacks_stop_the_run() {
    let dir = project(&[("src/App.tsx", APP)]);
    let recommendations = (1..=5)
        .map(|i| swap(&format!("Heading attempt {}", i), "text-sm", "text-lg"))
        .collect();
    let mut engine = IterationLoop::new(
        IterationLoopConfig::new(dir.path()),
        collaborators(recommendations, false, &[4.0]),
    );

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::Failed);
    assert_eq!(summary.iterations.len(), 3);
    assert!(summary.iterations[2].fatal);
    assert!(!summary.iterations[1].fatal);
    assert_eq!(summary.final_score, 4.0);
    assert_eq!(read(dir.path(), "src/App.tsx"), APP);
}

#[tokio::test]
async fn test_target_reached_before_any_iteration() {
    let dir = project(&[("src/App.tsx", APP)]);
    let mut engine = IterationLoop::new(
        IterationLoopConfig::new(dir.path()),
        collaborators(vec![swap("Larger heading", "text-sm", "text-base")], true, &[9.5]),
    );

    let summary = engine.run().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::TargetReached);
    assert!(summary.iterations.is_empty());
    assert_eq!(read(dir.path(), "src/App.tsx"), APP);
}

#[tokio::test]
async fn test_source_exhaustion_and_budget() {
    let dir = project(&[("src/App.tsx", APP)]);
    let mut engine = IterationLoop::new(
        IterationLoopConfig::new(dir.path()),
        collaborators(
            vec![swap("Larger heading", "text-sm", "text-base")],
            true,
            &[5.0, 6.0],
        ),
    );
    let summary = engine.run().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
    assert_eq!(summary.iterations.len(), 1);

    let dir = project(&[("src/App.tsx", APP)]);
    let mut config = IterationLoopConfig::new(dir.path());
    config.loop_config.max_iterations = 1;
    let mut engine = IterationLoop::new(
        config,
        collaborators(
            vec![
                swap("Larger heading", "text-sm", "text-base"),
                swap("Looser body", "gap-1", "gap-2"),
            ],
            true,
            &[5.0, 6.0],
        ),
    );
    let summary = engine.run().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::BudgetExhausted);
    assert_eq!(summary.iterations.len(), 1);
}

#[tokio::test]
async fn test_cancelled_run_touches_nothing() {
    let dir = project(&[("src/App.tsx", APP)]);
    let mut engine = IterationLoop::new(
        IterationLoopConfig::new(dir.path()),
        collaborators(vec![swap("Larger heading", "text-sm", "text-base")], true, &[5.0]),
    );
    engine.cancel();

    let summary = engine.run().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert!(summary.iterations.is_empty());
    assert_eq!(read(dir.path(), "src/App.tsx"), APP);
}

#[tokio::test]
async fn test_memory_is_persisted_after_each_iteration() {
    let dir = project(&[("src/App.tsx", APP)]);
    let memory_path = dir.path().join(".refine/memory.json");
    let mut config = IterationLoopConfig::new(dir.path());
    config.memory_path = Some(memory_path.clone());
    let mut engine = IterationLoop::new(
        config,
        collaborators(vec![swap("Larger heading", "text-sm", "text-base")], true, &[5.0, 5.5]),
    );

    engine.run().await.unwrap();

    let saved = IterationMemory::load(&memory_path).unwrap();
    assert_eq!(saved.attempted.len(), 1);
    assert_eq!(saved.latest_score(), Some(5.5));

    // A second loop continues the iteration numbering from saved memory.
    let mut engine = IterationLoop::new(
        IterationLoopConfig::new(dir.path()),
        collaborators(vec![swap("Looser body", "gap-1", "gap-2")], true, &[6.0]),
    )
    .with_memory(saved);
    let IterationStep::Completed(report) = engine.run_once().await.unwrap() else {
        panic!("expected a completed iteration");
    };
    assert_eq!(report.iteration, 2);
    assert_eq!(report.score_before, 5.5);
}

#[tokio::test]
async fn test_single_iteration_entry_point() {
    let dir = project(&[("src/App.tsx", APP)]);
    let input = IterationInput {
        recommendation: swap("Larger heading", "text-sm", "text-base"),
        project_root: dir.path().to_path_buf(),
        prior_memory: IterationMemory::default(),
        constraints: ValidationConstraints::default(),
    };
    let services = IterationServices {
        proposer: Box::new(LiteralSwapProposer::default()),
        build: Box::new(FixedBuild { pass: true }),
        visual: None,
        scorer: Box::new(SequenceScorer::new(&[5.0, 6.0])),
    };

    let output = run_single(input, services, &RefineConfig::default()).await.unwrap();

    assert_eq!(output.iteration_outcome, IterationOutcome::Continue);
    assert_eq!(output.file_changes.len(), 1);
    assert!(output.file_changes[0].success);
    assert_eq!(output.file_changes[0].resolved_line, Some(4));
    assert_eq!(output.validation.len(), 1);
    assert!(output.validation[0].valid);
    assert_eq!(output.new_memory.score_history.len(), 1);
    assert_eq!(output.new_memory.score_history[0].delta, 1.0);
    assert!(read(dir.path(), "src/App.tsx").contains("className=\"text-base\""));
}
