//! Path Utilities
//!
//! Project-relative path normalization and the default locations of the
//! engine's own files inside a project.

use std::path::{Path, PathBuf};

use crate::utils::error::EngineResult;

/// Directory, relative to the project root, for engine state.
pub const STATE_DIR: &str = ".refine";

/// Default configuration file name in the project root.
pub const CONFIG_FILE: &str = "refine.toml";

/// Normalize a relative path to forward slashes without a leading `./`.
pub fn normalize_rel_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.trim_end_matches('/').to_string()
}

/// `path` relative to `root`, normalized; `None` when outside the root.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| normalize_rel_path(&rel.to_string_lossy()))
}

/// `<project>/refine.toml`
pub fn default_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE)
}

/// `<project>/.refine/memory.json`
pub fn default_memory_path(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join("memory.json")
}

/// Create the parent directory of `path` if it does not exist.
pub fn ensure_parent_dir(path: &Path) -> EngineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
