//! Pre-iteration Snapshots
//!
//! Full file contents captured before Executing, restored verbatim on
//! rollback. Each snapshot carries a SHA-256 digest; a restore is only
//! reported successful once the bytes on disk hash to the same value.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use similar::{ChangeTag, TextDiff};
use tracing::{debug, info, warn};

use crate::utils::error::{EngineError, EngineResult};

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// One file as it was before the iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Path relative to the project root
    pub path: String,
    /// `None` when the file did not exist
    pub content: Option<Vec<u8>>,
    /// Digest of `content`; empty when the file did not exist
    pub sha256: String,
}

/// Line-level difference between a snapshot and the file on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStats {
    pub inserted: usize,
    pub deleted: usize,
}

/// Snapshots of every file an iteration may touch.
#[derive(Debug, Clone)]
pub struct IterationSnapshot {
    root: PathBuf,
    files: BTreeMap<String, FileSnapshot>,
}

impl IterationSnapshot {
    /// Read `files` (relative to `root`) as they are now.
    pub fn capture(root: &Path, files: &[String]) -> EngineResult<Self> {
        let mut snapshots = BTreeMap::new();
        for rel in files {
            let abs = root.join(rel);
            let content = match std::fs::read(&abs) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            let sha256 = content.as_deref().map(sha256_hex).unwrap_or_default();
            snapshots.insert(
                rel.clone(),
                FileSnapshot {
                    path: rel.clone(),
                    content,
                    sha256,
                },
            );
        }
        debug!(files = snapshots.len(), "Captured snapshot");
        Ok(Self {
            root: root.to_path_buf(),
            files: snapshots,
        })
    }

    pub fn files(&self) -> impl Iterator<Item = &FileSnapshot> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, rel: &str) -> Option<&FileSnapshot> {
        self.files.get(rel)
    }

    /// Snapshot text of `rel`; empty for a file that did not exist.
    pub fn original_text(&self, rel: &str) -> Option<String> {
        let snapshot = self.files.get(rel)?;
        Some(
            snapshot
                .content
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default(),
        )
    }

    fn current_digest(&self, rel: &str) -> EngineResult<String> {
        match std::fs::read(self.root.join(rel)) {
            Ok(bytes) => Ok(sha256_hex(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `rel` on disk matches its snapshot byte for byte.
    pub fn verify(&self, rel: &str) -> EngineResult<bool> {
        let snapshot = self
            .files
            .get(rel)
            .ok_or_else(|| EngineError::rollback(format!("no snapshot for {}", rel)))?;
        Ok(self.current_digest(rel)? == snapshot.sha256)
    }

    /// Files whose content differs from the snapshot.
    pub fn changed_files(&self) -> EngineResult<Vec<String>> {
        let mut changed = Vec::new();
        for rel in self.files.keys() {
            if !self.verify(rel)? {
                changed.push(rel.clone());
            }
        }
        Ok(changed)
    }

    pub fn diff_stats(&self, rel: &str) -> EngineResult<DiffStats> {
        let original = self.original_text(rel).unwrap_or_default();
        let current = match std::fs::read_to_string(self.root.join(rel)) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let diff = TextDiff::from_lines(&original, &current);
        let mut stats = DiffStats::default();
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => stats.inserted += 1,
                ChangeTag::Delete => stats.deleted += 1,
                ChangeTag::Equal => {}
            }
        }
        Ok(stats)
    }

    /// Put `rel` back exactly as captured and verify the digest.
    pub fn restore_file(&self, rel: &str) -> EngineResult<()> {
        let snapshot = self
            .files
            .get(rel)
            .ok_or_else(|| EngineError::rollback(format!("no snapshot for {}", rel)))?;
        let abs = self.root.join(rel);

        match &snapshot.content {
            Some(bytes) => write_atomically(&abs, bytes)
                .map_err(|e| EngineError::rollback(format!("{}: {}", rel, e)))?,
            None => match std::fs::remove_file(&abs) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(EngineError::rollback(format!("{}: {}", rel, e))),
            },
        }

        if !self.verify(rel)? {
            return Err(EngineError::rollback(format!(
                "{} does not match its snapshot after restore",
                rel
            )));
        }
        debug!(file = %rel, "Restored file");
        Ok(())
    }

    /// Restore every file that differs from its snapshot.
    ///
    /// Keeps going after a failed restore; returns the restored files, or the
    /// first error once every file has been tried.
    pub fn restore_all(&self) -> EngineResult<Vec<String>> {
        let mut restored = Vec::new();
        let mut first_error: Option<EngineError> = None;

        for rel in self.files.keys() {
            match self.verify(rel) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!(file = %rel, error = %e, "Could not compare file with snapshot");
                }
            }
            match self.restore_file(rel) {
                Ok(()) => restored.push(rel.clone()),
                Err(e) => {
                    warn!(file = %rel, error = %e, "Restore failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        info!(files = restored.len(), "Rolled back to snapshot");
        Ok(restored)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = std::fs::metadata(path) {
        std::fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
