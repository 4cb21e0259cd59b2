//! Command-backed Collaborators
//!
//! Build check, visual check and scorer implemented as subprocesses run in
//! the project root, for use from the CLI:
//!
//! - Exit code 0 -> passed
//! - Non-zero exit code -> failed, with stderr/stdout lines as errors
//! - Program not found -> skipped (tool not available)
//! - Timeout -> failed

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use refine_core::{BuildReport, BuildVerifier, CoreError, CoreResult, ScoreReport, Scorer, VisualVerifier};
use refine_validation::{build_gate_for, detect_project_type, static_regex, BuildGate};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Error lines kept from a failing command.
const MAX_ERROR_LINES: usize = 40;

/// How a subprocess ended.
#[derive(Debug)]
pub(crate) enum CommandOutcome {
    Completed {
        success: bool,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    NotFound,
    TimedOut,
    Failed(std::io::Error),
}

pub(crate) async fn run_command(gate: &BuildGate, cwd: &Path, limit: Duration) -> CommandOutcome {
    let mut cmd = Command::new(&gate.program);
    cmd.args(&gate.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(command = %gate.command_line(), "Running command");
    match timeout(limit, cmd.output()).await {
        Ok(Ok(output)) => CommandOutcome::Completed {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        },
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => CommandOutcome::NotFound,
        Ok(Err(e)) => CommandOutcome::Failed(e),
        Err(_) => CommandOutcome::TimedOut,
    }
}

fn error_lines(stderr: &str, stdout: &str) -> Vec<String> {
    stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .take(MAX_ERROR_LINES)
        .map(String::from)
        .collect()
}

fn report_for(gate: &BuildGate, outcome: CommandOutcome, limit: Duration) -> BuildReport {
    match outcome {
        CommandOutcome::Completed { success: true, .. } => BuildReport::passed(),
        CommandOutcome::Completed {
            code,
            stdout,
            stderr,
            ..
        } => {
            let mut errors = vec![format!(
                "{} exited with code {}",
                gate.command_line(),
                code.unwrap_or(-1)
            )];
            errors.extend(error_lines(&stderr, &stdout));
            BuildReport::failed(errors)
        }
        CommandOutcome::NotFound => {
            warn!(program = %gate.program, "Tool not available, skipping check");
            BuildReport::skipped(format!("Tool not available: {}", gate.program))
        }
        CommandOutcome::TimedOut => BuildReport::failed(vec![format!(
            "{} timed out after {}s",
            gate.command_line(),
            limit.as_secs()
        )]),
        CommandOutcome::Failed(e) => {
            BuildReport::failed(vec![format!("{}: execution error: {}", gate.command_line(), e)])
        }
    }
}

// ============================================================================
// Build
// ============================================================================

/// Runs an explicit build command, or the one detected for the project type.
#[derive(Debug, Clone)]
pub struct CommandBuildVerifier {
    command: Option<BuildGate>,
    timeout: Duration,
}

impl CommandBuildVerifier {
    pub fn new(command: Option<Vec<String>>, timeout_secs: u64) -> Self {
        Self {
            command: command.as_deref().and_then(BuildGate::from_argv),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn gate_for(&self, project_root: &Path) -> CoreResult<Option<BuildGate>> {
        if let Some(gate) = &self.command {
            return Ok(Some(gate.clone()));
        }
        let detection = detect_project_type(project_root)?;
        let gate = build_gate_for(&detection);
        debug!(
            project_type = detection.project_type.display_name(),
            gate = ?gate.as_ref().map(BuildGate::command_line),
            "Detected build gate"
        );
        Ok(gate)
    }
}

#[async_trait]
impl BuildVerifier for CommandBuildVerifier {
    async fn verify(&self, project_root: &Path) -> CoreResult<BuildReport> {
        let Some(gate) = self.gate_for(project_root)? else {
            return Ok(BuildReport::skipped("No build command for this project type"));
        };
        let outcome = run_command(&gate, project_root, self.timeout).await;
        let report = report_for(&gate, outcome, self.timeout);
        info!(command = %gate.command_line(), success = report.success, skipped = report.skipped, "Build check");
        Ok(report)
    }
}

// ============================================================================
// Visual
// ============================================================================

/// Runs a visual/console check command; skipped when none is configured.
#[derive(Debug, Clone)]
pub struct CommandVisualVerifier {
    command: Option<BuildGate>,
    timeout: Duration,
}

impl CommandVisualVerifier {
    pub fn new(command: Option<Vec<String>>, timeout_secs: u64) -> Self {
        Self {
            command: command.as_deref().and_then(BuildGate::from_argv),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl VisualVerifier for CommandVisualVerifier {
    async fn check(&self, project_root: &Path) -> CoreResult<BuildReport> {
        let Some(gate) = &self.command else {
            return Ok(BuildReport::skipped("No visual check configured"));
        };
        let outcome = run_command(gate, project_root, self.timeout).await;
        let report = report_for(gate, outcome, self.timeout);
        info!(command = %gate.command_line(), success = report.success, "Visual check");
        Ok(report)
    }
}

// ============================================================================
// Scorer
// ============================================================================

/// Parse scorer output: a JSON object with `score`/`composite` (and an
/// optional numeric `breakdown`), or the first number on the last line
/// that has one.
pub fn parse_score_output(stdout: &str) -> Option<ScoreReport> {
    let trimmed = stdout.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let composite = map
            .get("score")
            .or_else(|| map.get("composite"))
            .and_then(|v| v.as_f64())?;
        let mut report = ScoreReport::composite(composite);
        if let Some(serde_json::Value::Object(parts)) = map.get("breakdown") {
            report.breakdown = parts
                .iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect::<BTreeMap<_, _>>();
        }
        return Some(report);
    }

    trimmed
        .lines()
        .rev()
        .find_map(|line| number_re().find(line))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .map(ScoreReport::composite)
}

static_regex!(number_re, r"-?\d+(?:\.\d+)?");

/// Scores the project by running a command and parsing its stdout.
#[derive(Debug, Clone)]
pub struct CommandScorer {
    command: BuildGate,
    timeout: Duration,
}

impl CommandScorer {
    /// `None` when `argv` is empty.
    pub fn new(argv: &[String], timeout_secs: u64) -> Option<Self> {
        Some(Self {
            command: BuildGate::from_argv(argv)?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[async_trait]
impl Scorer for CommandScorer {
    async fn score(&self, project_root: &Path) -> CoreResult<ScoreReport> {
        let line = self.command.command_line();
        match run_command(&self.command, project_root, self.timeout).await {
            CommandOutcome::Completed {
                success: true,
                stdout,
                ..
            } => parse_score_output(&stdout)
                .ok_or_else(|| CoreError::parse(format!("no score in output of {}", line))),
            CommandOutcome::Completed { code, stderr, .. } => Err(CoreError::command(format!(
                "{} exited with code {}: {}",
                line,
                code.unwrap_or(-1),
                stderr.trim()
            ))),
            CommandOutcome::NotFound => Err(CoreError::not_found(format!(
                "scorer program not found: {}",
                self.command.program
            ))),
            CommandOutcome::TimedOut => Err(CoreError::timeout(format!(
                "{} timed out after {}s",
                line,
                self.timeout.as_secs()
            ))),
            CommandOutcome::Failed(e) => Err(CoreError::command(format!("{}: {}", line, e))),
        }
    }
}
