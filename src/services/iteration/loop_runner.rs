//! Iteration Loop Runner
//!
//! Drives one recommendation at a time through
//! `Proposing -> Planning -> Executing -> Verifying -> Scoring` and decides
//! whether the run continues. Iterations are strictly sequential: each one
//! reads the score and memory the previous one left behind.
//!
//! Every external call (recommendation source, proposer, build and visual
//! checks, scorer) is bounded by `phase_timeout_secs`. Cancellation is only
//! observed between phases, never while the toolkit is writing.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;

use refine_core::{
    BuildReport, BuildVerifier, Recommendation, RecommendationSource, Scorer, VisualVerifier,
};
use refine_toolkit::{ChangeLogStats, ChangeRecord};
use refine_validation::{
    validate, validate_cross_file, ValidationConstraints, Violation, ViolationKind,
};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DiscoveryConfig, RefineConfig};
use crate::models::{
    AttemptStatus, FileCrossCheck, IterationMemory, IterationOutcome, IterationReport, LoopConfig,
    LoopPhase, RunSummary, SkippedRecommendation, StopReason,
};
use crate::services::memory::DuplicateKind;
use crate::services::plan::{Discovery, PlanExecutor, PlanProposer};
use crate::services::verification::IterationSnapshot;
use crate::utils::error::{EngineError, EngineResult};

/// Configuration for the iteration loop
#[derive(Debug, Clone)]
pub struct IterationLoopConfig {
    /// Project root directory
    pub project_root: PathBuf,
    /// Loop thresholds and budgets
    pub loop_config: LoopConfig,
    /// Validation constraints applied to every touched file
    pub constraints: ValidationConstraints,
    /// Candidate-file discovery settings
    pub discovery: DiscoveryConfig,
    /// Toolkit fallback window
    pub fallback_window: usize,
    /// Save memory here after every iteration
    pub memory_path: Option<PathBuf>,
}

impl IterationLoopConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::from_config(project_root, &RefineConfig::default())
    }

    pub fn from_config(project_root: impl Into<PathBuf>, config: &RefineConfig) -> Self {
        Self {
            project_root: project_root.into(),
            loop_config: config.iteration.clone(),
            constraints: config.constraints.clone(),
            discovery: config.discovery.clone(),
            fallback_window: config.toolkit.fallback_window,
            memory_path: None,
        }
    }
}

/// The external collaborators one loop talks to.
pub struct Collaborators {
    pub source: Box<dyn RecommendationSource>,
    pub proposer: Box<dyn PlanProposer>,
    pub build: Box<dyn BuildVerifier>,
    /// Optional visual-regression / console check
    pub visual: Option<Box<dyn VisualVerifier>>,
    pub scorer: Box<dyn Scorer>,
}

/// Events emitted during a run
#[derive(Debug, Clone)]
pub enum IterationEvent {
    /// Run started
    Started { max_iterations: u32 },
    /// Baseline score measured
    Baseline { score: f64 },
    /// New iteration started
    IterationStarted { iteration: u32 },
    /// Phase transition
    PhaseChanged { iteration: u32, phase: LoopPhase },
    /// Recommendation dropped by duplicate suppression
    DuplicateSkipped {
        iteration: u32,
        title: String,
        kind: DuplicateKind,
    },
    /// Discovery produced a grounded plan
    PlanReady {
        iteration: u32,
        steps: usize,
        files: Vec<String>,
    },
    /// A touched file failed validation
    ValidationFailed {
        iteration: u32,
        file: String,
        violations: Vec<String>,
    },
    /// Files restored from the snapshot
    RolledBack {
        iteration: u32,
        files: Vec<String>,
        reason: String,
    },
    /// Score recorded
    Scored {
        iteration: u32,
        before: f64,
        after: f64,
        delta: f64,
    },
    /// Iteration finished
    IterationCompleted {
        iteration: u32,
        status: AttemptStatus,
        outcome: IterationOutcome,
    },
    /// Run finished
    Completed {
        stop_reason: StopReason,
        final_score: f64,
    },
    /// Error occurred
    Error { message: String },
}

/// What `run_once` produced.
#[derive(Debug, Clone)]
pub enum IterationStep {
    /// The iteration ran to an outcome
    Completed(IterationReport),
    /// The source had nothing left
    SourceExhausted { skipped: Vec<SkippedRecommendation> },
    /// Cancelled at a phase boundary; carries the partial report, with any
    /// applied changes already rolled back
    Cancelled(Option<IterationReport>),
}

/// Await `fut` for at most `limit`.
async fn bounded<T, E, F>(limit: Duration, what: &str, fut: F) -> EngineResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<EngineError>,
{
    match timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(EngineError::timeout(format!(
            "{} exceeded {}s",
            what,
            limit.as_secs()
        ))),
    }
}

/// The recommendation -> plan -> execute -> verify -> score -> memorize loop.
pub struct IterationLoop {
    config: IterationLoopConfig,
    collaborators: Collaborators,
    memory: IterationMemory,
    discovery: Discovery,
    executor: PlanExecutor,
    events: Option<mpsc::Sender<IterationEvent>>,
    cancellation_token: CancellationToken,
    phase: LoopPhase,
    iteration: u32,
    current_score: Option<f64>,
    consecutive_rollbacks: u32,
}

impl IterationLoop {
    pub fn new(config: IterationLoopConfig, collaborators: Collaborators) -> Self {
        let discovery = Discovery::new(
            config.project_root.clone(),
            config.discovery.clone(),
            config.fallback_window,
        );
        let executor = PlanExecutor::new(config.project_root.clone(), config.fallback_window);
        let mut this = Self {
            config,
            collaborators,
            memory: IterationMemory::default(),
            discovery,
            executor,
            events: None,
            cancellation_token: CancellationToken::new(),
            phase: LoopPhase::Idle,
            iteration: 0,
            current_score: None,
            consecutive_rollbacks: 0,
        };
        this.apply_memory_settings();
        this
    }

    /// Continue from memory left by an earlier run.
    pub fn with_memory(mut self, memory: IterationMemory) -> Self {
        self.iteration = memory
            .attempted
            .iter()
            .map(|a| a.iteration)
            .chain(memory.score_history.iter().map(|s| s.iteration))
            .max()
            .unwrap_or(0);
        self.current_score = memory.latest_score();
        self.memory = memory;
        self.apply_memory_settings();
        self
    }

    pub fn with_events(mut self, tx: mpsc::Sender<IterationEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn apply_memory_settings(&mut self) {
        let settings = &mut self.memory.settings;
        settings.min_improvement = self.config.loop_config.min_improvement;
        settings.near_duplicate_threshold = self.config.loop_config.near_duplicate_threshold;
    }

    /// Get the cancellation token
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Cancel execution at the next phase boundary
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn memory(&self) -> &IterationMemory {
        &self.memory
    }

    pub fn into_memory(self) -> IterationMemory {
        self.memory
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Session change-log statistics across every iteration.
    pub fn change_stats(&self) -> ChangeLogStats {
        self.executor.stats()
    }

    /// Reset memory and counters for a fresh run.
    pub fn start_fresh(&mut self) {
        self.memory.reset();
        self.apply_memory_settings();
        self.iteration = 0;
        self.current_score = None;
        self.consecutive_rollbacks = 0;
        self.phase = LoopPhase::Idle;
    }

    fn project_root(&self) -> &Path {
        &self.config.project_root
    }

    fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.config.loop_config.phase_timeout_secs)
    }

    async fn emit(&self, event: IterationEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    async fn set_phase(&mut self, phase: LoopPhase) {
        self.phase = phase;
        if phase != LoopPhase::Idle {
            debug!(iteration = self.iteration, phase = %phase, "Phase");
            self.emit(IterationEvent::PhaseChanged {
                iteration: self.iteration,
                phase,
            })
            .await;
        }
    }

    /// Current score, asking the scorer once if nothing is known yet.
    pub async fn baseline_score(&mut self) -> EngineResult<f64> {
        if let Some(score) = self.current_score {
            return Ok(score);
        }
        let limit = self.phase_timeout();
        let report = bounded(
            limit,
            "baseline scoring",
            self.collaborators.scorer.score(&self.config.project_root),
        )
        .await?;
        info!(score = report.composite, "Baseline score");
        self.current_score = Some(report.composite);
        self.emit(IterationEvent::Baseline {
            score: report.composite,
        })
        .await;
        Ok(report.composite)
    }

    // ========================================================================
    // Run
    // ========================================================================

    /// Run until a terminal state, the budget, the end of the source, or
    /// cancellation.
    pub async fn run(&mut self) -> EngineResult<RunSummary> {
        let start_time = Instant::now();
        let max_iterations = self.config.loop_config.max_iterations;
        self.emit(IterationEvent::Started { max_iterations }).await;

        let initial_score = match self.baseline_score().await {
            Ok(score) => score,
            Err(e) => {
                self.emit(IterationEvent::Error {
                    message: e.to_string(),
                })
                .await;
                return Err(e);
            }
        };

        let mut reports: Vec<IterationReport> = Vec::new();
        let stop_reason = if initial_score >= self.config.loop_config.target_score {
            StopReason::TargetReached
        } else {
            loop {
                if self.cancellation_token.is_cancelled() {
                    break StopReason::Cancelled;
                }
                if reports.len() as u32 >= max_iterations {
                    break StopReason::BudgetExhausted;
                }

                let step = match self.run_once().await {
                    Ok(step) => step,
                    Err(e) => {
                        self.emit(IterationEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                        return Err(e);
                    }
                };

                match step {
                    IterationStep::Completed(report) => {
                        let outcome = report.outcome;
                        let fatal = report.fatal;
                        reports.push(report);
                        match outcome {
                            IterationOutcome::TargetReached => break StopReason::TargetReached,
                            IterationOutcome::Plateaued => break StopReason::Plateaued,
                            IterationOutcome::Failed if fatal => break StopReason::Failed,
                            _ => {}
                        }
                    }
                    IterationStep::SourceExhausted { .. } => break StopReason::SourceExhausted,
                    IterationStep::Cancelled(report) => {
                        reports.extend(report);
                        break StopReason::Cancelled;
                    }
                }
            }
        };

        let final_score = self.current_score.unwrap_or(initial_score);
        info!(
            stop_reason = %stop_reason,
            iterations = reports.len(),
            initial_score,
            final_score,
            "Run finished"
        );
        self.emit(IterationEvent::Completed {
            stop_reason,
            final_score,
        })
        .await;

        Ok(RunSummary {
            stop_reason,
            iterations: reports,
            initial_score,
            final_score,
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    // ========================================================================
    // One iteration
    // ========================================================================

    /// Run a single iteration.
    pub async fn run_once(&mut self) -> EngineResult<IterationStep> {
        if self.cancellation_token.is_cancelled() {
            return Ok(IterationStep::Cancelled(None));
        }
        let score_before = self.baseline_score().await?;
        let limit = self.phase_timeout();
        let iteration = self.iteration + 1;
        let mut report = IterationReport::new(iteration, score_before);

        // ── Proposing ──────────────────────────────────────────────────
        self.phase = LoopPhase::Proposing;
        let summary = self.memory.context_summary();
        let mut recommendation = None;
        for _ in 0..self.config.loop_config.max_proposals_per_iteration.max(1) {
            let next = bounded(
                limit,
                "recommendation source",
                self.collaborators.source.next_recommendation(&summary),
            )
            .await;
            match next {
                Ok(Some(rec)) => {
                    if let Some(kind) = self.memory.duplicate_kind(&rec) {
                        info!(title = %rec.title, kind = %kind, "Skipping duplicate recommendation");
                        self.emit(IterationEvent::DuplicateSkipped {
                            iteration,
                            title: rec.title.clone(),
                            kind,
                        })
                        .await;
                        report.skipped.push(SkippedRecommendation {
                            title: rec.title,
                            reason: kind.to_string(),
                        });
                        continue;
                    }
                    recommendation = Some(rec);
                    break;
                }
                Ok(None) => {
                    self.phase = LoopPhase::Idle;
                    return Ok(IterationStep::SourceExhausted {
                        skipped: report.skipped,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Recommendation source failed");
                    self.iteration = iteration;
                    report.status = AttemptStatus::Failed;
                    report.reason = format!("recommendation source failed: {}", e);
                    return Ok(IterationStep::Completed(self.finish(report).await));
                }
            }
        }

        self.iteration = iteration;
        self.emit(IterationEvent::IterationStarted { iteration }).await;
        self.emit(IterationEvent::PhaseChanged {
            iteration,
            phase: LoopPhase::Proposing,
        })
        .await;

        let Some(rec) = recommendation else {
            report.reason = "every proposed recommendation was a duplicate".to_string();
            return Ok(IterationStep::Completed(self.finish(report).await));
        };
        info!(iteration, title = %rec.title, dimension = %rec.dimension, "Recommendation selected");
        report.recommendation = Some(rec.clone());

        // ── Planning ───────────────────────────────────────────────────
        if self.cancellation_token.is_cancelled() {
            return Ok(IterationStep::Cancelled(Some(report)));
        }
        self.set_phase(LoopPhase::Planning).await;
        let planned = bounded(
            limit,
            "planning",
            self.discovery
                .plan(&rec, self.collaborators.proposer.as_ref(), &self.memory),
        )
        .await;

        let grounded = match planned {
            Ok(grounded) => grounded,
            Err(e) => {
                warn!(iteration, error = %e, "Planning failed");
                report.status = AttemptStatus::Failed;
                report.reason = format!("planning failed: {}", e);
                self.memory
                    .record_attempt(&rec, iteration, report.status, &report.reason, &[]);
                report.delta = self.memory.record_score(iteration, score_before, score_before);
                return Ok(IterationStep::Completed(self.finish(report).await));
            }
        };
        let plan = grounded.plan;

        if plan.is_empty() {
            self.set_phase(LoopPhase::Scoring).await;
            report.status = AttemptStatus::NoEffect;
            report.reason = if plan.strategy.is_empty() {
                "no concrete operation found".to_string()
            } else {
                format!("no concrete operation found: {}", plan.strategy)
            };
            report.plan = Some(plan);
            self.memory
                .record_attempt(&rec, iteration, report.status, &report.reason, &[]);
            report.delta = self.memory.record_score(iteration, score_before, score_before);
            return Ok(IterationStep::Completed(self.finish(report).await));
        }

        // ── Executing ──────────────────────────────────────────────────
        if self.cancellation_token.is_cancelled() {
            report.plan = Some(plan);
            return Ok(IterationStep::Cancelled(Some(report)));
        }
        self.set_phase(LoopPhase::Executing).await;
        let files = plan.files();
        self.emit(IterationEvent::PlanReady {
            iteration,
            steps: plan.len(),
            files: files.clone(),
        })
        .await;

        let snapshot = IterationSnapshot::capture(self.project_root(), &files)?;
        let execution = self.executor.execute(&plan);
        report.plan = Some(plan);
        report.change_records = execution.records.clone();

        if execution.all_failed() {
            report.status = AttemptStatus::NoEffect;
            report.reason = "no planned operation could be applied".to_string();
            self.memory.record_attempt(
                &rec,
                iteration,
                report.status,
                &report.reason,
                &execution.records,
            );
            report.delta = self.memory.record_score(iteration, score_before, score_before);
            return Ok(IterationStep::Completed(self.finish(report).await));
        }

        let mut invalid: Vec<String> = Vec::new();
        for file in &execution.touched_files {
            let original = snapshot.original_text(file).unwrap_or_default();
            let modified = std::fs::read_to_string(self.project_root().join(file))?;
            let mut result = validate(
                &original,
                &modified,
                &self.config.constraints,
                Some(rec.effort),
            )
            .for_file(file.clone());

            if self.config.loop_config.cross_file_check {
                let cross = validate_cross_file(
                    Path::new(file),
                    &original,
                    &modified,
                    self.project_root(),
                );
                for change in cross.high_impact() {
                    result.push_violation(Violation::new(
                        ViolationKind::CrossFileBreaking,
                        format!("Breaking change for dependents: {}", change.description),
                    ));
                }
                report.cross_file.push(FileCrossCheck {
                    file: file.clone(),
                    result: cross,
                });
            }

            if !result.valid {
                let violations = result.violation_messages();
                warn!(iteration, file = %file, violations = ?violations, "Validation failed");
                self.emit(IterationEvent::ValidationFailed {
                    iteration,
                    file: file.clone(),
                    violations,
                })
                .await;
                invalid.push(file.clone());
            }
            report.validations.push(result);
        }

        if !invalid.is_empty() {
            for file in &invalid {
                if let Err(e) = snapshot.restore_file(file) {
                    return Ok(IterationStep::Completed(
                        self.abort_on_restore_failure(report, &rec, e).await,
                    ));
                }
            }
            report.rolled_back = invalid.clone();
            self.emit(IterationEvent::RolledBack {
                iteration,
                files: invalid.clone(),
                reason: "validation".to_string(),
            })
            .await;
        }

        let kept: Vec<String> = execution
            .touched_files
            .iter()
            .filter(|f| !invalid.contains(f))
            .cloned()
            .collect();
        let kept_records: Vec<ChangeRecord> = execution
            .records
            .iter()
            .filter(|r| kept.contains(&r.file))
            .cloned()
            .collect();

        if kept.is_empty() {
            self.consecutive_rollbacks += 1;
            report.status = AttemptStatus::Failed;
            report.reason = format!(
                "validation rejected every change: {}",
                report
                    .validations
                    .iter()
                    .flat_map(|v| v.violation_messages())
                    .collect::<Vec<_>>()
                    .join("; ")
            );
            self.memory.record_attempt(
                &rec,
                iteration,
                report.status,
                &report.reason,
                &execution.records,
            );
            report.delta = self.memory.record_score(iteration, score_before, score_before);
            return Ok(IterationStep::Completed(self.finish(report).await));
        }

        // ── Verifying ──────────────────────────────────────────────────
        if self.cancellation_token.is_cancelled() {
            match snapshot.restore_all() {
                Ok(files) => report.rolled_back.extend(files),
                Err(e) => {
                    return Ok(IterationStep::Completed(
                        self.abort_on_restore_failure(report, &rec, e).await,
                    ))
                }
            }
            report.reason = "cancelled before verification".to_string();
            return Ok(IterationStep::Cancelled(Some(report)));
        }
        self.set_phase(LoopPhase::Verifying).await;

        let root = self.config.project_root.clone();
        let mut failure = check_passed(
            &mut report.build,
            bounded(limit, "build check", self.collaborators.build.verify(&root)).await,
        );
        if failure.is_none() {
            if let Some(visual) = &self.collaborators.visual {
                failure = check_passed(
                    &mut report.visual,
                    bounded(limit, "visual check", visual.check(&root)).await,
                );
            }
        }

        if let Some(reason) = failure {
            warn!(iteration, reason = %reason, "Verification failed, rolling back");
            if let Err(e) = self.roll_back(&snapshot, &mut report, &reason).await {
                return Ok(IterationStep::Completed(
                    self.abort_on_restore_failure(report, &rec, e).await,
                ));
            }
            self.consecutive_rollbacks += 1;
            report.status = AttemptStatus::BrokeBuild;
            report.reason = reason;
            self.memory.record_attempt(
                &rec,
                iteration,
                report.status,
                &report.reason,
                &kept_records,
            );
            return Ok(IterationStep::Completed(self.finish(report).await));
        }

        // ── Scoring ────────────────────────────────────────────────────
        self.set_phase(LoopPhase::Scoring).await;
        let scored = bounded(limit, "scoring", self.collaborators.scorer.score(&root)).await;
        let score_after = match scored {
            Ok(score) => score.composite,
            Err(e) => {
                let reason = format!("scoring failed: {}", e);
                warn!(iteration, reason = %reason, "Rolling back");
                if let Err(e) = self.roll_back(&snapshot, &mut report, &reason).await {
                    return Ok(IterationStep::Completed(
                        self.abort_on_restore_failure(report, &rec, e).await,
                    ));
                }
                self.consecutive_rollbacks += 1;
                report.status = AttemptStatus::Failed;
                report.reason = reason;
                self.memory.record_attempt(
                    &rec,
                    iteration,
                    report.status,
                    &report.reason,
                    &kept_records,
                );
                return Ok(IterationStep::Completed(self.finish(report).await));
            }
        };

        self.consecutive_rollbacks = 0;
        report.committed = kept;
        report.status = self.memory.record_attempt(
            &rec,
            iteration,
            AttemptStatus::Success,
            format!("{} change(s) committed", kept_records.len()),
            &kept_records,
        );
        report.reason = format!("{} change(s) committed", kept_records.len());
        report.delta = self.memory.record_score(iteration, score_before, score_after);
        report.score_after = score_after;
        self.current_score = Some(score_after);
        self.emit(IterationEvent::Scored {
            iteration,
            before: score_before,
            after: score_after,
            delta: report.delta,
        })
        .await;

        Ok(IterationStep::Completed(self.finish(report).await))
    }

    async fn roll_back(
        &self,
        snapshot: &IterationSnapshot,
        report: &mut IterationReport,
        reason: &str,
    ) -> EngineResult<()> {
        let files = snapshot.restore_all()?;
        for file in &files {
            if !report.rolled_back.contains(file) {
                report.rolled_back.push(file.clone());
            }
        }
        self.emit(IterationEvent::RolledBack {
            iteration: report.iteration,
            files,
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn abort_on_restore_failure(
        &mut self,
        mut report: IterationReport,
        rec: &Recommendation,
        error: EngineError,
    ) -> IterationReport {
        warn!(iteration = report.iteration, error = %error, "Rollback failed");
        report.status = AttemptStatus::BrokeBuild;
        report.reason = format!("rollback failed: {}", error);
        report.fatal = true;
        self.memory.record_attempt(
            rec,
            report.iteration,
            report.status,
            &report.reason,
            &[],
        );
        self.finish(report).await
    }

    /// Decide the outcome, persist memory and close the iteration.
    async fn finish(&mut self, mut report: IterationReport) -> IterationReport {
        let loop_config = &self.config.loop_config;
        let max_rollbacks = loop_config.max_consecutive_rollbacks;

        if !report.fatal && max_rollbacks > 0 && self.consecutive_rollbacks >= max_rollbacks {
            report.fatal = true;
            report.reason = format!(
                "{} ({} consecutive rollbacks)",
                report.reason, self.consecutive_rollbacks
            );
        }

        report.outcome = if report.fatal {
            IterationOutcome::Failed
        } else if report.score_after >= loop_config.target_score {
            IterationOutcome::TargetReached
        } else if self.memory.is_plateaued(loop_config.plateau_window) {
            IterationOutcome::Plateaued
        } else if matches!(
            report.status,
            AttemptStatus::Failed | AttemptStatus::BrokeBuild
        ) {
            IterationOutcome::Failed
        } else {
            IterationOutcome::Continue
        };

        if let Some(path) = &self.config.memory_path {
            if let Err(e) = self.memory.save(path) {
                warn!(path = %path.display(), error = %e, "Could not save iteration memory");
            }
        }

        info!(
            iteration = report.iteration,
            status = %report.status,
            outcome = %report.outcome,
            delta = report.delta,
            "Iteration completed"
        );
        self.emit(IterationEvent::IterationCompleted {
            iteration: report.iteration,
            status: report.status,
            outcome: report.outcome,
        })
        .await;
        self.phase = LoopPhase::Idle;
        report
    }
}

/// Store a verification report and return the failure reason, if any.
fn check_passed(slot: &mut Option<BuildReport>, result: EngineResult<BuildReport>) -> Option<String> {
    match result {
        Ok(report) => {
            let failure = (!report.success).then(|| {
                if report.errors.is_empty() {
                    "verification failed".to_string()
                } else {
                    report.errors.join("; ")
                }
            });
            *slot = Some(report);
            failure
        }
        Err(e) if e.is_timeout() => Some(format!("verification timed out: {}", e)),
        Err(e) => Some(format!("verification error: {}", e)),
    }
}
