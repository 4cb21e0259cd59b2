//! Plan/Execute Workflow Integration Tests
//!
//! Discovery reads and grounds, the proposer stays advisory, the executor
//! applies mechanically:
//! - literal directives become grounded operations on the right lines
//! - stale line numbers are re-targeted, invented values are dropped
//! - partial execution reports the applied and the failed steps

use async_trait::async_trait;

use refine_engine::config::DiscoveryConfig;
use refine_engine::models::{CandidateFile, ChangePlan, IterationMemory};
use refine_engine::refine_core::Recommendation;
use refine_engine::refine_toolkit::{MutationOperation, DEFAULT_FALLBACK_WINDOW};
use refine_engine::services::plan::{Discovery, LiteralSwapProposer, PlanExecutor, PlanProposer};
use refine_engine::EngineResult;

use crate::support::{project, read};

const HEADER: &str = "export function Header() {\n\
  return (\n\
    <header className=\"bg-white\">\n\
      <h1 className=\"text-sm text-gray-400\">Acme</h1>\n\
      <nav className=\"gap-1\">\n\
        <a className=\"text-gray-400\">Docs</a>\n\
      </nav>\n\
    </header>\n\
  );\n\
}\n";

const FOOTER: &str = "export function Footer() {\n\
  return <footer className=\"text-gray-400\">(c) Acme</footer>;\n\
}\n";

fn discovery(root: &std::path::Path) -> Discovery {
    Discovery::new(root, DiscoveryConfig::default(), DEFAULT_FALLBACK_WINDOW)
}

/// Proposer that returns a fixed plan regardless of input.
struct ScriptedProposer(ChangePlan);

#[async_trait]
impl PlanProposer for ScriptedProposer {
    async fn propose(
        &self,
        _recommendation: &Recommendation,
        _candidates: &[CandidateFile],
        _memory: &IterationMemory,
    ) -> EngineResult<ChangePlan> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn test_literal_swap_end_to_end() {
    let dir = project(&[
        ("src/components/Header.tsx", HEADER),
        ("src/components/Footer.tsx", FOOTER),
        ("README.md", "text-gray-400 is used everywhere\n"),
    ]);
    let rec = Recommendation::new(
        "accessibility",
        "Increase contrast",
        "Muted text fails contrast checks: `text-gray-400` -> `text-gray-700`.",
    );

    let grounded = discovery(dir.path())
        .plan(&rec, &LiteralSwapProposer::default(), &IterationMemory::default())
        .await
        .unwrap();
    assert!(grounded.dropped.is_empty());
    let plan = grounded.plan;
    assert_eq!(plan.len(), 3);
    let mut files = plan.files();
    files.sort();
    assert_eq!(
        files,
        vec![
            "src/components/Footer.tsx".to_string(),
            "src/components/Header.tsx".to_string()
        ]
    );

    let mut executor = PlanExecutor::new(dir.path(), DEFAULT_FALLBACK_WINDOW);
    let report = executor.execute(&plan);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert!(!report.is_partial());

    assert_eq!(
        read(dir.path(), "src/components/Header.tsx"),
        HEADER.replace("text-gray-400", "text-gray-700")
    );
    assert_eq!(
        read(dir.path(), "src/components/Footer.tsx"),
        FOOTER.replace("text-gray-400", "text-gray-700")
    );
    // Markdown is not a candidate extension.
    assert_eq!(read(dir.path(), "README.md"), "text-gray-400 is used everywhere\n");
}

#[tokio::test]
async fn test_grounding_retargets_and_drops() {
    let dir = project(&[("src/components/Header.tsx", HEADER)]);
    let rec = Recommendation::new("layout", "Looser nav", "Give the nav some air")
        .with_target_file("src/components/Header.tsx");

    let mut proposed = ChangePlan::new("scripted", "nav spacing");
    // Stale line number, value exists exactly once further down.
    proposed.push(
        MutationOperation::set_line_token("src/components/Header.tsx", 40, "gap-1", "gap-3"),
        "spacing",
    );
    // Value that does not exist anywhere.
    proposed.push(
        MutationOperation::set_line_token("src/components/Header.tsx", 3, "bg-slate-50", "bg-white"),
        "background",
    );
    // File Discovery never read.
    proposed.push(
        MutationOperation::set_line_token("src/components/Sidebar.tsx", 1, "w-64", "w-72"),
        "width",
    );
    // Correct as proposed.
    proposed.push(
        MutationOperation::set_text_run("src/components/Header.tsx", 4, "Acme", "Acme Inc."),
        "brand",
    );

    let grounded = discovery(dir.path())
        .plan(&rec, &ScriptedProposer(proposed), &IterationMemory::default())
        .await
        .unwrap();

    assert_eq!(grounded.plan.len(), 2);
    assert_eq!(grounded.retargeted, vec![(40, 5)]);
    assert_eq!(grounded.dropped.len(), 2);
    assert_eq!(grounded.plan.steps[0].operation.line(), 5);

    let mut executor = PlanExecutor::new(dir.path(), DEFAULT_FALLBACK_WINDOW);
    let report = executor.execute(&grounded.plan);
    assert_eq!(report.succeeded, 2);
    let header = read(dir.path(), "src/components/Header.tsx");
    assert!(header.contains("<nav className=\"gap-3\">"));
    assert!(header.contains(">Acme Inc.</h1>"));
}

#[tokio::test]
async fn test_recommendation_without_literals_plans_nothing() {
    let dir = project(&[("src/components/Header.tsx", HEADER)]);
    let rec = Recommendation::new("visual", "Make the header feel modern", "Refresh the look")
        .with_component("Header");

    let grounded = discovery(dir.path())
        .plan(&rec, &LiteralSwapProposer::default(), &IterationMemory::default())
        .await
        .unwrap();
    assert!(grounded.plan.is_empty());
    assert_eq!(read(dir.path(), "src/components/Header.tsx"), HEADER);
}

#[tokio::test]
async fn test_partial_execution_is_reported() {
    let dir = project(&[("src/components/Footer.tsx", FOOTER)]);
    let mut plan = ChangePlan::new("direct", "footer tweaks");
    plan.push(
        MutationOperation::set_line_token("src/components/Footer.tsx", 2, "text-gray-400", "text-gray-600"),
        "contrast",
    );
    plan.push(
        MutationOperation::set_text_run("src/components/Footer.tsx", 2, "(c) Globex", "(c) Initech"),
        "brand",
    );

    let mut executor = PlanExecutor::new(dir.path(), DEFAULT_FALLBACK_WINDOW);
    let report = executor.execute(&plan);
    assert!(report.is_partial());
    assert!(!report.all_failed());
    assert_eq!(report.touched_files, vec!["src/components/Footer.tsx".to_string()]);
    assert_eq!(report.records.len(), 2);
    assert!(report.records[0].success);
    assert!(!report.records[1].success);
    assert_eq!(executor.stats().total, 2);
}
