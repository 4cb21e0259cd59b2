//! Configuration
//!
//! `RefineConfig` is read from `refine.toml` in the project root (or an
//! explicit path). Every field has a default, so a missing file or a partial
//! file is fine; malformed TOML is a configuration error.
//!
//! ```toml
//! [constraints]
//! max_line_delta = 60
//!
//! [[constraints.effort_brackets]]
//! min = 1
//! max = 4
//! max_changed_lines = 30
//!
//! [iteration]
//! target_score = 8.5
//!
//! [verification]
//! build_command = ["npm", "run", "build"]
//! score_command = ["node", "scripts/score.js"]
//! ```

use std::path::Path;

use refine_toolkit::DEFAULT_FALLBACK_WINDOW;
use refine_validation::ValidationConstraints;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::LoopConfig;
use crate::utils::error::{EngineError, EngineResult};

/// `[toolkit]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// ±N lines searched when a value is not on its requested line
    #[serde(default = "default_fallback_window")]
    pub fallback_window: usize,
}

fn default_fallback_window() -> usize {
    DEFAULT_FALLBACK_WINDOW
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            fallback_window: default_fallback_window(),
        }
    }
}

/// `[discovery]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// File extensions considered for candidates
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Glob patterns (relative to the project root) never considered
    #[serde(default = "default_ignore_globs")]
    pub ignore_globs: Vec<String>,
    /// Candidates handed to the proposer
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Larger files are skipped
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_extensions() -> Vec<String> {
    ["tsx", "ts", "jsx", "js", "vue", "svelte", "html", "css", "scss"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignore_globs() -> Vec<String> {
    [
        "node_modules/**",
        "dist/**",
        "build/**",
        ".next/**",
        "coverage/**",
        "**/*.min.js",
        "**/*.test.*",
        "**/*.spec.*",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_candidates() -> usize {
    20
}

fn default_max_file_bytes() -> u64 {
    256 * 1024
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore_globs: default_ignore_globs(),
            max_candidates: default_max_candidates(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

/// `[verification]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Explicit build command; auto-detected from the project type when absent
    #[serde(default)]
    pub build_command: Option<Vec<String>>,
    /// Visual/console check command; skipped when absent
    #[serde(default)]
    pub visual_command: Option<Vec<String>>,
    /// Command printing a 0-10 score (or `{"score": n}`) on stdout
    #[serde(default)]
    pub score_command: Option<Vec<String>>,
    /// Per-command timeout; falls back to `iteration.phase_timeout_secs`
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefineConfig {
    #[serde(default)]
    pub constraints: ValidationConstraints,
    #[serde(default)]
    pub toolkit: ToolkitConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub iteration: LoopConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
}

impl RefineConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: RefineConfig =
            toml::from_str(text).map_err(|e| EngineError::config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| EngineError::config(format!("{}: {}", path.display(), e)))
    }

    /// Semantic checks serde cannot express.
    fn check(&self) -> EngineResult<()> {
        if !(0.0..=10.0).contains(&self.iteration.target_score) {
            return Err(EngineError::config("iteration.target_score must be within 0-10"));
        }
        if self.constraints.max_growth_ratio < 0.0 {
            return Err(EngineError::config("constraints.max_growth_ratio must not be negative"));
        }
        if self.iteration.plateau_window == 0 {
            return Err(EngineError::config("iteration.plateau_window must be at least 1"));
        }
        for command in [
            &self.verification.build_command,
            &self.verification.visual_command,
            &self.verification.score_command,
        ]
        .into_iter()
        .flatten()
        {
            if command.is_empty() {
                return Err(EngineError::config("verification commands must not be empty"));
            }
        }
        Ok(())
    }

    /// Timeout for verification commands.
    pub fn verification_timeout_secs(&self) -> u64 {
        self.verification
            .timeout_secs
            .unwrap_or(self.iteration.phase_timeout_secs)
    }
}
