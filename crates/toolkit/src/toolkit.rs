//! Mutation Toolkit
//!
//! Reads a file, resolves the operation's before-value, replaces exactly that
//! span on exactly one line and writes the result through a temporary file
//! plus rename. Any failure before the rename leaves the file untouched.
//! Every call, successful or not, appends one `ChangeRecord` to the log.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::MutationError;
use crate::matcher::{locate_in_lines, token_spans, Resolution, DEFAULT_FALLBACK_WINDOW};
use crate::operation::MutationOperation;
use crate::record::{ChangeLog, ChangeLogStats, ChangeRecord};
use crate::text_utils::decode_editable_text;

/// Outcome of applying an operation to in-memory text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Full text after the edit
    pub new_text: String,
    pub resolution: Resolution,
    pub line_before: String,
    pub line_after: String,
}

/// Split text into `(content, line_ending)` pairs. Concatenating every pair
/// reproduces the input exactly.
fn split_lines(text: &str) -> Vec<(&str, &str)> {
    text.split_inclusive('\n')
        .map(|piece| {
            if let Some(content) = piece.strip_suffix("\r\n") {
                (content, "\r\n")
            } else if let Some(content) = piece.strip_suffix('\n') {
                (content, "\n")
            } else {
                (piece, "")
            }
        })
        .collect()
}

/// Apply `op` to `text`, returning the edited text.
///
/// Pure function: used by the toolkit before writing and by callers that want
/// to preview an edit.
pub fn apply_to_text(
    text: &str,
    op: &MutationOperation,
    window: usize,
) -> Result<TextEdit, MutationError> {
    let pieces = split_lines(text);
    let contents: Vec<&str> = pieces.iter().map(|(content, _)| *content).collect();
    let resolution = locate_in_lines(&contents, op, window)?;

    let index = resolution.line - 1;
    let line = contents[index];
    let span = resolution.span.clone();

    let line_after = match op {
        MutationOperation::AppendToken { appended_token, .. } => {
            let appended = appended_token.trim();
            if appended.is_empty() {
                return Err(MutationError::InvalidOperation(
                    "appended token is empty".to_string(),
                ));
            }
            if !token_spans(line, appended).is_empty() {
                return Err(MutationError::AlreadyPresent {
                    token: appended.to_string(),
                    line: resolution.line,
                });
            }
            format!("{} {}{}", &line[..span.end], appended, &line[span.end..])
        }
        _ => format!("{}{}{}", &line[..span.start], op.after().trim(), &line[span.end..]),
    };

    if line_after == line {
        return Err(MutationError::InvalidOperation(
            "before and after values are identical".to_string(),
        ));
    }

    let mut new_text = String::with_capacity(text.len() + line_after.len());
    for (i, (content, ending)) in pieces.iter().enumerate() {
        if i == index {
            new_text.push_str(&line_after);
        } else {
            new_text.push_str(content);
        }
        new_text.push_str(ending);
    }

    Ok(TextEdit {
        new_text,
        line_before: line.to_string(),
        line_after,
        resolution,
    })
}

/// Write `bytes` to `path` via a sibling temporary file and a rename.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// The atomic file-edit primitives, bound to one project root.
#[derive(Debug)]
pub struct MutationToolkit {
    project_root: PathBuf,
    fallback_window: usize,
    log: ChangeLog,
}

impl MutationToolkit {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            fallback_window: DEFAULT_FALLBACK_WINDOW,
            log: ChangeLog::new(),
        }
    }

    /// Override the ±N line fallback window.
    pub fn with_fallback_window(mut self, window: usize) -> Self {
        self.fallback_window = window;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn fallback_window(&self) -> usize {
        self.fallback_window
    }

    /// Resolve a relative operation path, rejecting anything that could leave
    /// the project root.
    pub fn resolve_path(&self, relative: &str) -> Result<PathBuf, MutationError> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.trim().is_empty() || rel.is_absolute() || escapes {
            return Err(MutationError::InvalidPath(relative.to_string()));
        }
        Ok(self.project_root.join(rel))
    }

    fn try_apply(&self, op: &MutationOperation) -> Result<TextEdit, MutationError> {
        let path = self.resolve_path(op.file())?;
        let bytes = fs::read(&path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let text = decode_editable_text(&bytes, &ext)
            .ok_or_else(|| MutationError::BinaryFile(op.file().to_string()))?;

        let edit = apply_to_text(&text, op, self.fallback_window)?;
        write_atomically(&path, edit.new_text.as_bytes())?;
        Ok(edit)
    }

    /// Apply one operation and record the outcome.
    pub fn apply(&mut self, op: &MutationOperation) -> ChangeRecord {
        let record = match self.try_apply(op) {
            Ok(edit) => {
                debug!(
                    file = op.file(),
                    requested = op.line(),
                    resolved = edit.resolution.line,
                    kind = %op.kind(),
                    "mutation applied"
                );
                ChangeRecord::applied(op, edit.resolution.line, edit.line_before, edit.line_after)
            }
            Err(e) => {
                warn!(file = op.file(), line = op.line(), kind = %op.kind(), "mutation failed: {}", e);
                ChangeRecord::failed(op, &e)
            }
        };
        self.log.push(record.clone());
        record
    }

    pub fn set_line_token(
        &mut self,
        file: &str,
        line: usize,
        old_token: &str,
        new_token: &str,
    ) -> ChangeRecord {
        self.apply(&MutationOperation::set_line_token(file, line, old_token, new_token))
    }

    pub fn set_property_value(
        &mut self,
        file: &str,
        line: usize,
        property: &str,
        old_value: &str,
        new_value: &str,
    ) -> ChangeRecord {
        self.apply(&MutationOperation::set_property_value(
            file, line, property, old_value, new_value,
        ))
    }

    pub fn set_text_run(
        &mut self,
        file: &str,
        line: usize,
        old_text: &str,
        new_text: &str,
    ) -> ChangeRecord {
        self.apply(&MutationOperation::set_text_run(file, line, old_text, new_text))
    }

    pub fn append_token(
        &mut self,
        file: &str,
        line: usize,
        anchor_token: &str,
        appended_token: &str,
    ) -> ChangeRecord {
        self.apply(&MutationOperation::append_token(
            file,
            line,
            anchor_token,
            appended_token,
        ))
    }

    pub fn log(&self) -> &ChangeLog {
        &self.log
    }

    /// Hand the accumulated log to the caller and start a fresh one.
    pub fn take_log(&mut self) -> ChangeLog {
        std::mem::take(&mut self.log)
    }

    pub fn stats(&self) -> ChangeLogStats {
        self.log.stats()
    }
}
