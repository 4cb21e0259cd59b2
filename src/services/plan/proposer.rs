//! Plan Proposers
//!
//! A proposer is the advisory half of Plan/Execute: it sees the
//! recommendation, the candidate files and a read-only view of memory, and
//! returns literal operations. Nothing it returns reaches the toolkit before
//! Discovery has grounded it against the file text.

use async_trait::async_trait;
use refine_core::Recommendation;
use refine_toolkit::{matching_lines, MutationOperation};
use refine_validation::static_regex;

use crate::models::{CandidateFile, ChangePlan, IterationMemory};
use crate::utils::error::EngineResult;

/// Turns a recommendation into a change plan.
#[async_trait]
pub trait PlanProposer: Send + Sync {
    async fn propose(
        &self,
        recommendation: &Recommendation,
        candidates: &[CandidateFile],
        memory: &IterationMemory,
    ) -> EngineResult<ChangePlan>;
}

static_regex!(arrow_re, r"`([^`\n]+)`\s*(?:->|→|=>)\s*`([^`\n]*)`");
static_regex!(change_re, r"(?i)\bchange\s+`([^`\n]+)`\s+to\s+`([^`\n]*)`");
static_regex!(replace_re, r"(?i)\breplace\s+`([^`\n]+)`\s+with\s+`([^`\n]*)`");
static_regex!(add_re, r"(?i)\badd\s+`([^`\n]+)`\s+(?:after|next\s+to)\s+`([^`\n]+)`");

/// A literal edit named in recommendation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Replace `from` with `to`
    Swap { from: String, to: String },
    /// Add `token` next to `anchor`
    Append { anchor: String, token: String },
}

/// Extract literal directives from the title and description, in order of
/// appearance, without duplicates.
pub fn parse_directives(recommendation: &Recommendation) -> Vec<Directive> {
    let text = format!("{}\n{}", recommendation.title, recommendation.description);
    let mut found: Vec<(usize, Directive)> = Vec::new();

    for re in [arrow_re(), change_re(), replace_re()] {
        for caps in re.captures_iter(&text) {
            let from = caps[1].trim().to_string();
            let to = caps[2].trim().to_string();
            if from.is_empty() || from == to {
                continue;
            }
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            found.push((start, Directive::Swap { from, to }));
        }
    }
    for caps in add_re().captures_iter(&text) {
        let token = caps[1].trim().to_string();
        let anchor = caps[2].trim().to_string();
        if token.is_empty() || anchor.is_empty() {
            continue;
        }
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        found.push((start, Directive::Append { anchor, token }));
    }

    found.sort_by_key(|(start, _)| *start);
    let mut directives: Vec<Directive> = Vec::new();
    for (_, directive) in found {
        if !directives.contains(&directive) {
            directives.push(directive);
        }
    }
    directives
}

/// A value without whitespace or quotes is edited as a whole token;
/// anything else as a literal text run.
fn is_token_like(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '<' | '>'))
}

/// Plans the literal swaps a recommendation spells out, e.g.
/// ``use `text-base` instead: `text-sm` -> `text-base` ``.
///
/// Recommendations without a literal directive get an empty plan.
#[derive(Debug, Clone)]
pub struct LiteralSwapProposer {
    max_operations: usize,
}

impl Default for LiteralSwapProposer {
    fn default() -> Self {
        Self { max_operations: 20 }
    }
}

impl LiteralSwapProposer {
    pub fn new(max_operations: usize) -> Self {
        Self {
            max_operations: max_operations.max(1),
        }
    }

    fn swap_operations(
        &self,
        file: &CandidateFile,
        from: &str,
        to: &str,
    ) -> Vec<MutationOperation> {
        let template = |line: usize| {
            if is_token_like(from) {
                MutationOperation::set_line_token(&file.path, line, from, to)
            } else {
                MutationOperation::set_text_run(&file.path, line, from, to)
            }
        };
        // When the replacement itself contains the value, a second pass on the
        // same line would hit the replacement.
        let self_matching = !matching_lines(to, &template(1)).is_empty();

        let mut ops = Vec::new();
        for (line, count) in matching_lines(&file.content, &template(1)) {
            if count == 1 {
                ops.push(template(line));
            } else {
                let repeats = if self_matching { 1 } else { count };
                for _ in 0..repeats {
                    ops.push(template(line).with_occurrence(1));
                }
            }
        }
        ops
    }

    fn append_operations(
        &self,
        file: &CandidateFile,
        anchor: &str,
        token: &str,
    ) -> Vec<MutationOperation> {
        let template = |line: usize| MutationOperation::append_token(&file.path, line, anchor, token);
        let present = MutationOperation::set_line_token(&file.path, 1, token, token);
        let lines_with_token: Vec<usize> = matching_lines(&file.content, &present)
            .into_iter()
            .map(|(line, _)| line)
            .collect();

        matching_lines(&file.content, &template(1))
            .into_iter()
            .filter(|(line, _)| !lines_with_token.contains(line))
            .map(|(line, count)| {
                if count == 1 {
                    template(line)
                } else {
                    template(line).with_occurrence(1)
                }
            })
            .collect()
    }
}

#[async_trait]
impl PlanProposer for LiteralSwapProposer {
    async fn propose(
        &self,
        recommendation: &Recommendation,
        candidates: &[CandidateFile],
        _memory: &IterationMemory,
    ) -> EngineResult<ChangePlan> {
        let directives = parse_directives(recommendation);
        if directives.is_empty() {
            return Ok(ChangePlan::empty("no literal edit named in the recommendation"));
        }

        let summary: Vec<String> = directives
            .iter()
            .map(|d| match d {
                Directive::Swap { from, to } => format!("`{}` -> `{}`", from, to),
                Directive::Append { anchor, token } => format!("add `{}` after `{}`", token, anchor),
            })
            .collect();
        let mut plan = ChangePlan::new(
            format!("Literal edits: {}", summary.join(", ")),
            format!(
                "{} ({}, impact {})",
                recommendation.title, recommendation.dimension, recommendation.impact
            ),
        );

        'files: for file in candidates {
            for directive in &directives {
                let (ops, rationale) = match directive {
                    Directive::Swap { from, to } => (
                        self.swap_operations(file, from, to),
                        format!("replace `{}` with `{}`", from, to),
                    ),
                    Directive::Append { anchor, token } => (
                        self.append_operations(file, anchor, token),
                        format!("add `{}` after `{}`", token, anchor),
                    ),
                };
                for op in ops {
                    if plan.len() >= self.max_operations {
                        break 'files;
                    }
                    plan.push(op, rationale.clone());
                }
            }
        }

        Ok(plan)
    }
}
