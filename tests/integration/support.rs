//! Test fakes for the loop collaborators plus small fixture helpers.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use refine_engine::refine_core::{
    BuildReport, BuildVerifier, CoreError, CoreResult, ScoreReport, Scorer, VisualVerifier,
};

/// Returns scores in order, then repeats the last one.
pub struct SequenceScorer {
    scores: Mutex<VecDeque<f64>>,
    last: Mutex<f64>,
    calls: Arc<Mutex<usize>>,
}

impl SequenceScorer {
    pub fn new(scores: &[f64]) -> Self {
        Self {
            scores: Mutex::new(scores.iter().copied().collect()),
            last: Mutex::new(scores.first().copied().unwrap_or(0.0)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Shared call counter, readable after the scorer is boxed.
    pub fn calls(&self) -> Arc<Mutex<usize>> {
        self.calls.clone()
    }
}

#[async_trait]
impl Scorer for SequenceScorer {
    async fn score(&self, _project_root: &Path) -> CoreResult<ScoreReport> {
        *self.calls.lock().unwrap() += 1;
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.scores.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(ScoreReport::composite(*last))
    }
}

/// Answers the first call with `baseline`, fails every call after it.
/// `None` fails from the start.
pub struct BrokenScorer {
    baseline: Mutex<Option<f64>>,
}

impl BrokenScorer {
    pub fn after_baseline(baseline: f64) -> Self {
        Self {
            baseline: Mutex::new(Some(baseline)),
        }
    }

    pub fn always() -> Self {
        Self {
            baseline: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Scorer for BrokenScorer {
    async fn score(&self, _project_root: &Path) -> CoreResult<ScoreReport> {
        match self.baseline.lock().unwrap().take() {
            Some(score) => Ok(ScoreReport::composite(score)),
            None => Err(CoreError::command("scorer crashed")),
        }
    }
}

/// Build verifier with a fixed verdict.
pub struct FixedBuild {
    pub pass: bool,
}

#[async_trait]
impl BuildVerifier for FixedBuild {
    async fn verify(&self, _project_root: &Path) -> CoreResult<BuildReport> {
        if self.pass {
            Ok(BuildReport::passed())
        } else {
            Ok(BuildReport::failed(vec![
                "error TS2304: Cannot find name 'x'".to_string()
            ]))
        }
    }
}

/// Build verifier that passes, but only after `delay`.
pub struct SlowBuild {
    pub delay: Duration,
}

#[async_trait]
impl BuildVerifier for SlowBuild {
    async fn verify(&self, _project_root: &Path) -> CoreResult<BuildReport> {
        tokio::time::sleep(self.delay).await;
        Ok(BuildReport::passed())
    }
}

/// Visual check with a fixed verdict.
pub struct FixedVisual {
    pub pass: bool,
}

#[async_trait]
impl VisualVerifier for FixedVisual {
    async fn check(&self, _project_root: &Path) -> CoreResult<BuildReport> {
        if self.pass {
            Ok(BuildReport::passed())
        } else {
            Ok(BuildReport::failed(vec!["console error: hydration mismatch".to_string()]))
        }
    }
}

/// Create a project directory populated with `files`.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (rel, content) in files {
        write(dir.path(), rel, content);
    }
    dir
}

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap()
}

/// `n` numbered lines, `line k` on line k, with a trailing newline.
pub fn numbered_lines(n: usize) -> String {
    (1..=n).map(|i| format!("line {}\n", i)).collect()
}
