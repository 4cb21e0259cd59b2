//! Cross-File Breaking-Change Analysis
//!
//! Diffs the interface of a modified file (exports, props interfaces, type
//! aliases) against its original, then scans the project for files that
//! import it and checks whether they use anything that changed. The check is
//! advisory: any analyzer failure yields a valid, skipped verdict.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, warn};

use crate::interface::{extract_imports, extract_interface, identifier_referenced, ImportStatement, InterfaceShape};
use crate::models::{BreakingChange, BreakingKind, CrossFileValidationResult, Impact};

/// Internal analyzer failure. Never escapes `validate_cross_file`.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];
const SKIP_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    "coverage",
    "target",
];
const DEFAULT_MAX_FILES: usize = 5_000;

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn strip_source_extension(path: &Path) -> PathBuf {
    if is_source_file(path) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}

/// How a dependent would have to use a changed name to be affected.
#[derive(Debug, Clone)]
enum Usage {
    Named(String),
    Default,
    Prop { component: String, field: String },
    Type(String),
}

#[derive(Debug)]
struct PendingChange {
    change: BreakingChange,
    usage: Usage,
}

fn breaking(
    kind: BreakingKind,
    name: impl Into<String>,
    description: String,
    before: Option<String>,
    after: Option<String>,
    impact: Impact,
) -> BreakingChange {
    BreakingChange {
        kind,
        name: name.into(),
        description,
        before,
        after,
        impact,
    }
}

/// Interface differences, classified by worst-case impact.
fn diff_interfaces(before: &InterfaceShape, after: &InterfaceShape) -> Vec<PendingChange> {
    let mut changes = Vec::new();

    if before.exports.has_default && !after.exports.has_default {
        changes.push(PendingChange {
            change: breaking(
                BreakingKind::ExportChanged,
                "default",
                "Default export removed".to_string(),
                Some("default".to_string()),
                None,
                Impact::High,
            ),
            usage: Usage::Default,
        });
    }
    for name in before.exports.removed_in(&after.exports) {
        changes.push(PendingChange {
            change: breaking(
                BreakingKind::ExportChanged,
                name.clone(),
                format!("Export '{}' removed", name),
                Some(name.clone()),
                None,
                Impact::High,
            ),
            usage: Usage::Named(name.clone()),
        });
    }

    for (iface, fields_before) in &before.props {
        let Some(fields_after) = after.props.get(iface) else {
            continue;
        };
        let component = iface.trim_end_matches("Props").to_string();
        for (field, old) in fields_before {
            let qualified = format!("{}.{}", iface, field);
            let usage = Usage::Prop {
                component: component.clone(),
                field: field.clone(),
            };
            match fields_after.get(field) {
                None => {
                    let (impact, label) = if old.optional {
                        (Impact::Medium, "optional")
                    } else {
                        (Impact::High, "required")
                    };
                    changes.push(PendingChange {
                        change: breaking(
                            BreakingKind::PropRemoved,
                            qualified,
                            format!("{} prop '{}' removed from {}", label, field, iface),
                            Some(old.type_text.clone()),
                            None,
                            impact,
                        ),
                        usage,
                    });
                }
                Some(new) if new.type_text != old.type_text || (old.optional && !new.optional) => {
                    let impact = if old.optional && new.optional {
                        Impact::Medium
                    } else {
                        Impact::High
                    };
                    let description = if new.type_text == old.type_text {
                        format!("prop '{}' of {} became required", field, iface)
                    } else {
                        format!(
                            "prop '{}' of {} changed type from '{}' to '{}'",
                            field, iface, old.type_text, new.type_text
                        )
                    };
                    changes.push(PendingChange {
                        change: breaking(
                            BreakingKind::PropTypeChanged,
                            qualified,
                            description,
                            Some(old.type_text.clone()),
                            Some(new.type_text.clone()),
                            impact,
                        ),
                        usage,
                    });
                }
                Some(_) => {}
            }
        }
    }

    for (alias, old) in &before.type_aliases {
        let new = after.type_aliases.get(alias);
        if new == Some(old) {
            continue;
        }
        let description = match new {
            Some(new) => format!("type '{}' changed from '{}' to '{}'", alias, old, new),
            None => format!("type '{}' removed", alias),
        };
        changes.push(PendingChange {
            change: breaking(
                BreakingKind::TypeChanged,
                alias.clone(),
                description,
                Some(old.clone()),
                new.cloned(),
                Impact::Medium,
            ),
            usage: Usage::Type(alias.clone()),
        });
    }

    changes
}

/// A file importing the analyzed file.
#[derive(Debug)]
struct Dependent {
    rel_path: String,
    text: String,
    imports: Vec<ImportStatement>,
}

impl Dependent {
    fn uses(&self, usage: &Usage) -> bool {
        match usage {
            Usage::Named(name) => self.imports.iter().any(|s| s.imports_name(name)),
            Usage::Default => self
                .imports
                .iter()
                .any(|s| s.default.is_some() || s.imports_name("default")),
            Usage::Prop { component, field } => {
                let locals: Vec<&str> = self
                    .imports
                    .iter()
                    .flat_map(|s| {
                        s.named
                            .iter()
                            .filter(|n| n.imported == *component)
                            .map(|n| n.local.as_str())
                            .chain(s.default.as_deref())
                    })
                    .collect();
                locals
                    .iter()
                    .any(|local| self.text.contains(&format!("<{}", local)))
                    && identifier_referenced(&self.text, field)
            }
            Usage::Type(name) => {
                self.imports.iter().any(|s| s.imports_name(name))
                    || identifier_referenced(&self.text, name)
            }
        }
    }
}

/// Dependency-aware analyzer bound to a project root.
#[derive(Debug, Clone)]
pub struct CrossFileAnalyzer {
    project_root: PathBuf,
    max_files: usize,
}

impl CrossFileAnalyzer {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            max_files: DEFAULT_MAX_FILES,
        }
    }

    /// Cap on the number of files scanned for dependents.
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.project_root).unwrap_or(path)
    }

    /// Resolve an import specifier written in `from_rel` to a project-relative
    /// module path without extension.
    fn resolve_specifier(&self, from_rel: &Path, specifier: &str) -> Option<PathBuf> {
        let joined = if specifier.starts_with('.') {
            from_rel.parent().unwrap_or(Path::new("")).join(specifier)
        } else if let Some(rest) = specifier.strip_prefix("@/") {
            Path::new("src").join(rest)
        } else {
            return None;
        };
        Some(strip_source_extension(&normalize(&joined)))
    }

    fn find_dependents(&self, target_rel: &Path) -> Vec<Dependent> {
        let target_module = strip_source_extension(target_rel);
        let target_is_index = target_module.file_name().is_some_and(|n| n == "index");
        let target_dir = target_module.parent().map(Path::to_path_buf);

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

        let mut dependents = Vec::new();
        let mut scanned = 0usize;
        for entry in builder.build() {
            let Ok(entry) = entry else {
                continue;
            };
            let path = entry.path();
            if !path.is_file() || !is_source_file(path) {
                continue;
            }
            scanned += 1;
            if scanned > self.max_files {
                debug!(max = self.max_files, "dependent scan truncated");
                break;
            }
            let rel = self.relative(path).to_path_buf();
            if rel == target_rel {
                continue;
            }
            let Ok(text) = std::fs::read_to_string(path) else {
                continue;
            };
            let imports: Vec<ImportStatement> = extract_imports(&text)
                .into_iter()
                .filter(|stmt| {
                    self.resolve_specifier(&rel, &stmt.source)
                        .is_some_and(|module| {
                            module == target_module
                                || (target_is_index && Some(&module) == target_dir.as_ref())
                        })
                })
                .collect();
            if !imports.is_empty() {
                dependents.push(Dependent {
                    rel_path: rel.to_string_lossy().replace('\\', "/"),
                    text,
                    imports,
                });
            }
        }
        dependents
    }

    /// Analyze one file. Errors are returned to the caller; use
    /// `validate_cross_file` for the fail-open behavior.
    pub fn analyze(
        &self,
        file_path: &Path,
        original: &str,
        modified: &str,
    ) -> Result<CrossFileValidationResult, AnalyzerError> {
        let target_rel = normalize(self.relative(file_path));
        if !is_source_file(&target_rel) {
            return Ok(CrossFileValidationResult::unchanged());
        }

        let before = extract_interface(original)?;
        let after = extract_interface(modified)?;
        let pending = diff_interfaces(&before, &after);
        if pending.is_empty() {
            return Ok(CrossFileValidationResult::unchanged());
        }

        let dependents = self.find_dependents(&target_rel);
        debug!(
            file = %target_rel.display(),
            changes = pending.len(),
            dependents = dependents.len(),
            "interface changed"
        );

        let mut result = CrossFileValidationResult {
            valid: true,
            ..Default::default()
        };
        let mut affected = BTreeSet::new();

        for PendingChange { mut change, usage } in pending {
            let users: Vec<&str> = dependents
                .iter()
                .filter(|d| d.uses(&usage))
                .map(|d| d.rel_path.as_str())
                .collect();

            if users.is_empty() {
                change.impact = Impact::Low;
            } else {
                affected.extend(users.iter().map(|u| u.to_string()));
                match change.impact {
                    Impact::High => result.suggestions.push(format!(
                        "Keep '{}' compatible or update its usages in {}",
                        change.name,
                        users.join(", ")
                    )),
                    Impact::Medium => result.suggestions.push(format!(
                        "Review usages of '{}' in {}",
                        change.name,
                        users.join(", ")
                    )),
                    Impact::Low => {}
                }
            }
            result.breaking_changes.push(change);
        }

        result.affected_files = affected.into_iter().collect();
        result.valid = !result.has_high_impact();
        Ok(result)
    }
}

/// Compare the interface of `file_path` before and after an edit and classify
/// the risk to its dependents. Fails open.
pub fn validate_cross_file(
    file_path: &Path,
    original: &str,
    modified: &str,
    project_root: &Path,
) -> CrossFileValidationResult {
    match CrossFileAnalyzer::new(project_root).analyze(file_path, original, modified) {
        Ok(result) => result,
        Err(e) => {
            warn!(file = %file_path.display(), "cross-file analysis skipped: {}", e);
            CrossFileValidationResult::skipped(e)
        }
    }
}
