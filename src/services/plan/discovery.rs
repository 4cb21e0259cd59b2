//! Discovery
//!
//! The read-only half of Plan/Execute. Enumerates candidate files for a
//! recommendation, reads them concurrently, asks the proposer for a plan and
//! grounds every proposed operation against the text it read:
//!
//! - value within the fallback window of the requested line: kept
//! - value on exactly one other line of the file: re-targeted to that line
//! - value nowhere (or on several lines): dropped
//!
//! Grounding runs against a working copy that already has the earlier
//! operations of the plan applied, so a kept operation sees the file the way
//! Execution will.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use ignore::WalkBuilder;
use refine_core::Recommendation;
use refine_toolkit::{
    apply_to_text, decode_editable_text, locate, matching_lines, MutationError, MutationOperation,
};
use refine_validation::static_regex;
use tracing::{debug, info, warn};

use super::proposer::PlanProposer;
use crate::config::DiscoveryConfig;
use crate::models::{CandidateFile, ChangePlan, IterationMemory, PlannedChange};
use crate::utils::error::EngineResult;
use crate::utils::paths::{normalize_rel_path, relative_to, STATE_DIR};

const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target", STATE_DIR];

/// Relevance weight of a keyword found in the path.
const PATH_WEIGHT: usize = 3;
/// Relevance weight of a quoted literal found in the content.
const LITERAL_WEIGHT: usize = 10;

static_regex!(quoted_literal_re, r"`([^`\n]+)`");

/// Backtick-quoted literals in the recommendation text.
fn quoted_literals(recommendation: &Recommendation) -> Vec<String> {
    let text = format!("{}\n{}", recommendation.title, recommendation.description);
    let mut literals: Vec<String> = Vec::new();
    for caps in quoted_literal_re().captures_iter(&text) {
        let literal = caps[1].trim().to_string();
        if !literal.is_empty() && !literals.contains(&literal) {
            literals.push(literal);
        }
    }
    literals
}

fn relevance(path: &str, content: &str, keywords: &[String], literals: &[String]) -> usize {
    let path_lower = path.to_lowercase();
    let content_lower = content.to_lowercase();
    let mut score = 0;
    for keyword in keywords {
        if path_lower.contains(keyword.as_str()) {
            score += PATH_WEIGHT;
        }
        if content_lower.contains(keyword.as_str()) {
            score += 1;
        }
    }
    for literal in literals {
        if content.contains(literal.as_str()) {
            score += LITERAL_WEIGHT;
        }
    }
    score
}

/// Why an operation was dropped during grounding.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedOperation {
    pub operation: MutationOperation,
    pub reason: String,
}

/// A grounded plan plus the operations grounding removed.
#[derive(Debug, Clone, Default)]
pub struct GroundedPlan {
    pub plan: ChangePlan,
    pub dropped: Vec<DroppedOperation>,
    /// Operations moved to another line, as `(requested, resolved)`
    pub retargeted: Vec<(usize, usize)>,
}

/// Read-only planning against one project.
#[derive(Debug, Clone)]
pub struct Discovery {
    project_root: PathBuf,
    config: DiscoveryConfig,
    fallback_window: usize,
}

impl Discovery {
    pub fn new(
        project_root: impl Into<PathBuf>,
        config: DiscoveryConfig,
        fallback_window: usize,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            config,
            fallback_window,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Enumerate, read and rank candidate files.
    ///
    /// Explicit `target_files` win over the keyword walk and keep their order.
    pub async fn candidates(&self, recommendation: &Recommendation) -> Vec<CandidateFile> {
        let explicit = !recommendation.target_files.is_empty();
        let paths = if explicit {
            self.explicit_paths(recommendation)
        } else {
            self.walk_paths()
        };

        let reads = join_all(paths.iter().map(|rel| {
            let abs = self.project_root.join(rel);
            async move { (rel.clone(), tokio::fs::read(abs).await) }
        }))
        .await;

        let keywords = recommendation.keywords();
        let literals = quoted_literals(recommendation);
        let mut candidates: Vec<CandidateFile> = reads
            .into_iter()
            .filter_map(|(rel, read)| {
                let bytes = match read {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        debug!(file = %rel, error = %e, "Skipping unreadable candidate");
                        return None;
                    }
                };
                let ext = Path::new(&rel)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_lowercase();
                let content = decode_editable_text(&bytes, &ext)?;
                let relevance = relevance(&rel, &content, &keywords, &literals);
                Some(CandidateFile {
                    path: rel,
                    content,
                    relevance,
                })
            })
            .collect();

        if !explicit {
            candidates.retain(|c| c.relevance > 0);
            // Stable: ties keep walk order (sorted paths).
            candidates.sort_by(|a, b| b.relevance.cmp(&a.relevance));
        }
        candidates.truncate(self.config.max_candidates);

        debug!(
            count = candidates.len(),
            explicit,
            "Discovery candidates"
        );
        candidates
    }

    fn explicit_paths(&self, recommendation: &Recommendation) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for raw in &recommendation.target_files {
            let rel = normalize_rel_path(raw);
            let escapes = Path::new(&rel).is_absolute()
                || Path::new(&rel)
                    .components()
                    .any(|c| matches!(c, std::path::Component::ParentDir));
            if rel.is_empty() || escapes {
                warn!(file = %raw, "Ignoring target file outside the project");
                continue;
            }
            if self.project_root.join(&rel).is_file() && !paths.contains(&rel) {
                paths.push(rel);
            } else if !paths.contains(&rel) {
                debug!(file = %rel, "Target file does not exist");
            }
        }
        paths
    }

    fn is_ignored(&self, rel: &str, patterns: &[glob::Pattern]) -> bool {
        patterns.iter().any(|p| p.matches(rel))
    }

    fn walk_paths(&self) -> Vec<String> {
        let patterns: Vec<glob::Pattern> = self
            .config
            .ignore_globs
            .iter()
            .filter_map(|g| match glob::Pattern::new(g) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(pattern = %g, error = %e, "Invalid ignore glob");
                    None
                }
            })
            .collect();

        let mut builder = WalkBuilder::new(&self.project_root);
        builder
            .hidden(false)
            .follow_links(false)
            .git_ignore(true)
            .filter_entry(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !SKIP_DIRS.contains(&name))
            });

        let mut paths = Vec::new();
        for entry in builder.build().flatten() {
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let ext_ok = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| {
                    self.config
                        .extensions
                        .iter()
                        .any(|allowed| allowed.eq_ignore_ascii_case(e))
                });
            if !ext_ok {
                continue;
            }
            let too_big = entry
                .metadata()
                .map(|m| m.len() > self.config.max_file_bytes)
                .unwrap_or(true);
            if too_big {
                continue;
            }
            let Some(rel) = relative_to(&self.project_root, path) else {
                continue;
            };
            if !self.is_ignored(&rel, &patterns) {
                paths.push(rel);
            }
        }
        paths.sort();
        paths
    }

    /// Verify every operation of `plan` against the candidate texts.
    ///
    /// Operations on files that were not read are dropped; Discovery only
    /// vouches for text it has seen.
    pub fn ground(&self, plan: ChangePlan, candidates: &[CandidateFile]) -> GroundedPlan {
        let mut working: HashMap<String, String> = candidates
            .iter()
            .map(|c| (normalize_rel_path(&c.path), c.content.clone()))
            .collect();

        let mut grounded = GroundedPlan {
            plan: ChangePlan::new(plan.strategy, plan.expected_impact),
            ..Default::default()
        };

        for step in plan.steps {
            let file = normalize_rel_path(step.operation.file());
            let Some(text) = working.get_mut(&file) else {
                warn!(file = %file, "Dropping operation on a file Discovery did not read");
                grounded.dropped.push(DroppedOperation {
                    operation: step.operation,
                    reason: "file was not read during discovery".to_string(),
                });
                continue;
            };

            let operation = match locate(text.as_str(), &step.operation, self.fallback_window) {
                Ok(_) => step.operation,
                Err(MutationError::TokenNotFound { .. } | MutationError::LineOutOfRange { .. }) => {
                    match retarget(text.as_str(), &step.operation) {
                        Some(op) => {
                            info!(
                                file = %file,
                                requested = step.operation.line(),
                                resolved = op.line(),
                                "Re-targeted operation"
                            );
                            grounded.retargeted.push((step.operation.line(), op.line()));
                            op
                        }
                        None => {
                            warn!(
                                file = %file,
                                line = step.operation.line(),
                                before = %step.operation.before(),
                                "Dropping operation whose value is not in the file"
                            );
                            grounded.dropped.push(DroppedOperation {
                                operation: step.operation,
                                reason: "expected value not found in file".to_string(),
                            });
                            continue;
                        }
                    }
                }
                Err(e) => {
                    warn!(file = %file, line = step.operation.line(), error = %e, "Dropping operation");
                    grounded.dropped.push(DroppedOperation {
                        operation: step.operation,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match apply_to_text(text.as_str(), &operation, self.fallback_window) {
                Ok(edit) => {
                    *text = edit.new_text;
                    grounded.plan.steps.push(PlannedChange {
                        operation,
                        rationale: step.rationale,
                    });
                }
                Err(e) => {
                    warn!(file = %file, line = operation.line(), error = %e, "Dropping operation");
                    grounded.dropped.push(DroppedOperation {
                        operation,
                        reason: e.to_string(),
                    });
                }
            }
        }

        grounded
    }

    /// Full Discovery for one recommendation.
    pub async fn plan(
        &self,
        recommendation: &Recommendation,
        proposer: &dyn PlanProposer,
        memory: &IterationMemory,
    ) -> EngineResult<GroundedPlan> {
        let candidates = self.candidates(recommendation).await;
        if candidates.is_empty() {
            info!(title = %recommendation.title, "No candidate files");
            return Ok(GroundedPlan {
                plan: ChangePlan::empty("no candidate files matched the recommendation"),
                ..Default::default()
            });
        }

        let proposed = proposer.propose(recommendation, &candidates, memory).await?;
        let proposed_len = proposed.len();
        let grounded = self.ground(proposed, &candidates);
        info!(
            proposed = proposed_len,
            kept = grounded.plan.len(),
            dropped = grounded.dropped.len(),
            retargeted = grounded.retargeted.len(),
            "Plan grounded"
        );
        Ok(grounded)
    }
}

/// Move an operation to the single line that holds its value, if there is one.
fn retarget(text: &str, op: &MutationOperation) -> Option<MutationOperation> {
    match matching_lines(text, op).as_slice() {
        [(line, count)] if *count == 1 || op.occurrence().is_some_and(|n| n <= *count) => {
            Some(op.retargeted(*line))
        }
        _ => None,
    }
}
