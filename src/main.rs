//! `refine` command line
//!
//! Thin shell over the engine: the iteration loop, one-off plan
//! application, file validation and memory inspection.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use refine_engine::models::{ChangePlan, IterationMemory};
use refine_engine::refine_toolkit::ChangeRecord;
use refine_engine::refine_core::VisualVerifier;
use refine_engine::refine_validation::{
    validate, validate_cross_file, CrossFileValidationResult, ValidationResult,
};
use refine_engine::services::{
    CommandBuildVerifier, CommandScorer, CommandVisualVerifier, IterationSnapshot,
};
use refine_engine::utils::logging::{init_tracing, LogFormat};
use refine_engine::utils::{default_config_path, default_memory_path};
use refine_engine::{
    Collaborators, IterationEvent, IterationLoop, IterationLoopConfig, LiteralSwapProposer,
    PlanExecutor, QueueRecommendationSource, RefineConfig,
};

#[derive(Parser)]
#[command(name = "refine", version, about = "Constrained mutation and iteration control engine")]
struct Cli {
    /// Debug-level logging for the engine crates
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (defaults to `<project>/refine.toml`)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the iteration loop over a queue of recommendations
    Run {
        /// Project root
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
        /// JSON file with the recommendation queue
        #[arg(short, long)]
        recommendations: PathBuf,
        /// Memory file (defaults to `<project>/.refine/memory.json`)
        #[arg(short, long)]
        memory: Option<PathBuf>,
        /// Discard remembered attempts and scores before running
        #[arg(long)]
        fresh: bool,
        /// Override `iteration.max_iterations`
        #[arg(long)]
        max_iterations: Option<u32>,
    },
    /// Execute a change plan once, then validate and keep or restore each file
    Apply {
        /// Project root
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
        /// JSON file containing a change plan
        #[arg(long)]
        plan: PathBuf,
        /// Effort hint (1-10) for the effort-bracket check
        #[arg(long)]
        effort: Option<u8>,
    },
    /// Validate a modified file against its original
    Validate {
        /// File before the edit
        #[arg(long)]
        original: PathBuf,
        /// File after the edit
        #[arg(long)]
        modified: PathBuf,
        /// Effort hint (1-10) for the effort-bracket check
        #[arg(long)]
        effort: Option<u8>,
        /// Also run cross-file analysis against this project root
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Print the memory summary handed to planners
    Memory {
        /// Project root
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
        /// Memory file (defaults to `<project>/.refine/memory.json`)
        #[arg(short, long)]
        memory: Option<PathBuf>,
        /// Print the raw memory document instead of the summary
        #[arg(long)]
        raw: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyReport {
    records: Vec<ChangeRecord>,
    validations: Vec<ValidationResult>,
    kept: Vec<String>,
    rolled_back: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateReport {
    validation: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    cross_file: Option<CrossFileValidationResult>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let format = if cli.json { LogFormat::Json } else { LogFormat::Pretty };
    init_tracing(format, cli.verbose)?;

    match cli.command {
        Command::Run {
            project,
            recommendations,
            memory,
            fresh,
            max_iterations,
        } => {
            let mut config = load_config(cli.config.as_deref(), &project)?;
            if let Some(max) = max_iterations {
                config.iteration.max_iterations = max;
            }
            run_loop(config, project, recommendations, memory, fresh).await
        }
        Command::Apply {
            project,
            plan,
            effort,
        } => {
            let config = load_config(cli.config.as_deref(), &project)?;
            apply_plan(&config, &project, &plan, effort)
        }
        Command::Validate {
            original,
            modified,
            effort,
            project,
        } => {
            let root = project.clone().unwrap_or_else(|| PathBuf::from("."));
            let config = load_config(cli.config.as_deref(), &root)?;
            validate_files(&config, &original, &modified, effort, project.as_deref())
        }
        Command::Memory {
            project,
            memory,
            raw,
        } => {
            let path = memory.unwrap_or_else(|| default_memory_path(&project));
            let memory = IterationMemory::load_or_default(&path)?;
            if raw {
                println!("{}", serde_json::to_string_pretty(&memory)?);
            } else {
                println!("{}", memory.context_summary());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(explicit: Option<&Path>, project: &Path) -> Result<RefineConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_config_path(project));
    RefineConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}

// ── run ──────────────────────────────────────────────────────────────────

async fn run_loop(
    config: RefineConfig,
    project: PathBuf,
    recommendations: PathBuf,
    memory_path: Option<PathBuf>,
    fresh: bool,
) -> Result<ExitCode> {
    let timeout_secs = config.verification_timeout_secs();
    let Some(score_command) = config.verification.score_command.as_deref() else {
        bail!("verification.score_command must be configured to run the loop");
    };
    let scorer = CommandScorer::new(score_command, timeout_secs)
        .context("verification.score_command is empty")?;
    let source = QueueRecommendationSource::from_file(&recommendations)
        .with_context(|| format!("reading {}", recommendations.display()))?;

    let collaborators = Collaborators {
        source: Box::new(source),
        proposer: Box::new(LiteralSwapProposer::default()),
        build: Box::new(CommandBuildVerifier::new(
            config.verification.build_command.clone(),
            timeout_secs,
        )),
        visual: config
            .verification
            .visual_command
            .clone()
            .map(|argv| {
                Box::new(CommandVisualVerifier::new(Some(argv), timeout_secs))
                    as Box<dyn VisualVerifier>
            }),
        scorer: Box::new(scorer),
    };

    let memory_path = memory_path.unwrap_or_else(|| default_memory_path(&project));
    let memory = IterationMemory::load_or_default(&memory_path)?;

    let mut loop_config = IterationLoopConfig::from_config(&project, &config);
    loop_config.memory_path = Some(memory_path.clone());

    let (tx, mut rx) = mpsc::channel::<IterationEvent>(64);
    let mut engine = IterationLoop::new(loop_config, collaborators)
        .with_memory(memory)
        .with_events(tx);
    if fresh {
        engine.start_fresh();
    }

    let events = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match &event {
                IterationEvent::RolledBack { iteration, files, reason } => {
                    warn!(iteration, files = ?files, "rolled back: {}", reason)
                }
                IterationEvent::Error { message } => warn!("loop error: {}", message),
                other => debug!(event = ?other, "loop event"),
            }
        }
    });

    let token = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling at the next phase boundary");
            token.cancel();
        }
    });

    let summary = engine.run().await?;
    engine.memory().save(&memory_path)?;
    drop(engine);
    let _ = events.await;

    info!(
        stop_reason = %summary.stop_reason,
        iterations = summary.iterations.len(),
        final_score = summary.final_score,
        "run finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let fatal = summary.iterations.iter().any(|report| report.fatal);
    Ok(if fatal { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

// ── apply ────────────────────────────────────────────────────────────────

fn apply_plan(
    config: &RefineConfig,
    project: &Path,
    plan_path: &Path,
    effort: Option<u8>,
) -> Result<ExitCode> {
    let text = std::fs::read_to_string(plan_path)
        .with_context(|| format!("reading {}", plan_path.display()))?;
    let plan: ChangePlan = serde_json::from_str(&text)
        .with_context(|| format!("parsing change plan {}", plan_path.display()))?;

    let snapshot = IterationSnapshot::capture(project, &plan.files())?;
    let mut executor = PlanExecutor::new(project, config.toolkit.fallback_window);
    let execution = executor.execute(&plan);

    let mut validations = Vec::new();
    let mut kept = Vec::new();
    let mut rolled_back = Vec::new();
    for file in &execution.touched_files {
        let original = snapshot.original_text(file).unwrap_or_default();
        let modified = std::fs::read_to_string(project.join(file))
            .with_context(|| format!("reading {}", file))?;
        let result = validate(&original, &modified, &config.constraints, effort).for_file(file);
        if result.valid {
            kept.push(file.clone());
        } else {
            snapshot.restore_file(file)?;
            rolled_back.push(file.clone());
        }
        validations.push(result);
    }

    let report = ApplyReport {
        records: execution.records,
        validations,
        kept,
        rolled_back,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    let clean = execution.failed == 0 && report.rolled_back.is_empty();
    Ok(if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ── validate ─────────────────────────────────────────────────────────────

fn validate_files(
    config: &RefineConfig,
    original: &Path,
    modified: &Path,
    effort: Option<u8>,
    project: Option<&Path>,
) -> Result<ExitCode> {
    let before = std::fs::read_to_string(original)
        .with_context(|| format!("reading {}", original.display()))?;
    let after = std::fs::read_to_string(modified)
        .with_context(|| format!("reading {}", modified.display()))?;

    let validation = validate(&before, &after, &config.constraints, effort)
        .for_file(modified.to_string_lossy().into_owned());
    let cross_file = project.map(|root| validate_cross_file(modified, &before, &after, root));

    let ok = validation.valid && cross_file.as_ref().map_or(true, |r| !r.has_high_impact());
    let report = ValidateReport {
        validation,
        cross_file,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
