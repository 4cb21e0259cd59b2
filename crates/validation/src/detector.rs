//! Project Type Detection
//!
//! Detects the project type from marker files (package.json, Cargo.toml,
//! pyproject.toml, go.mod) so a build gate can be chosen without
//! configuration.

use std::path::{Path, PathBuf};

use refine_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    /// Node.js/JavaScript/TypeScript project (package.json)
    NodeJs,
    /// Rust project (Cargo.toml)
    Rust,
    /// Python project (pyproject.toml, setup.py, requirements.txt)
    Python,
    /// Go project (go.mod)
    Go,
    Unknown,
}

impl ProjectType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectType::NodeJs => "Node.js",
            ProjectType::Rust => "Rust",
            ProjectType::Python => "Python",
            ProjectType::Go => "Go",
            ProjectType::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetection {
    pub project_type: ProjectType,
    pub marker_file: Option<String>,
    pub name: Option<String>,
    /// package.json declares a `build` script
    pub has_build_script: bool,
    pub has_typescript: bool,
}

impl ProjectDetection {
    fn unknown() -> Self {
        Self {
            project_type: ProjectType::Unknown,
            marker_file: None,
            name: None,
            has_build_script: false,
            has_typescript: false,
        }
    }
}

pub struct ProjectDetector {
    project_path: PathBuf,
}

impl ProjectDetector {
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    pub fn detect(&self) -> CoreResult<ProjectDetection> {
        let detections = [
            (ProjectType::NodeJs, "package.json"),
            (ProjectType::Rust, "Cargo.toml"),
            (ProjectType::Python, "pyproject.toml"),
            (ProjectType::Python, "setup.py"),
            (ProjectType::Python, "requirements.txt"),
            (ProjectType::Go, "go.mod"),
        ];

        for (project_type, marker) in detections {
            let marker_path = self.project_path.join(marker);
            if !marker_path.exists() {
                continue;
            }
            let mut detection = ProjectDetection {
                project_type,
                marker_file: Some(marker.to_string()),
                ..ProjectDetection::unknown()
            };
            match project_type {
                ProjectType::NodeJs => self.read_package_json(&marker_path, &mut detection)?,
                ProjectType::Rust => {
                    detection.name = read_toml_name(&marker_path, &["package"])?;
                }
                ProjectType::Python if marker == "pyproject.toml" => {
                    detection.name = read_toml_name(&marker_path, &["project"])?
                        .or(read_toml_name(&marker_path, &["tool", "poetry"])?);
                }
                ProjectType::Go => {
                    let content = std::fs::read_to_string(&marker_path)?;
                    detection.name = content
                        .lines()
                        .find_map(|l| l.strip_prefix("module "))
                        .map(|m| m.trim().to_string());
                }
                _ => {}
            }
            return Ok(detection);
        }

        Ok(ProjectDetection::unknown())
    }

    fn read_package_json(&self, marker_path: &Path, detection: &mut ProjectDetection) -> CoreResult<()> {
        let content = std::fs::read_to_string(marker_path)?;
        let json: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| CoreError::parse(format!("Failed to parse package.json: {}", e)))?;

        detection.name = json.get("name").and_then(|v| v.as_str()).map(String::from);
        detection.has_build_script = json
            .get("scripts")
            .and_then(|s| s.get("build"))
            .is_some();

        let has_ts_dep = ["devDependencies", "dependencies"]
            .iter()
            .any(|section| json.get(section).and_then(|d| d.get("typescript")).is_some());
        detection.has_typescript = has_ts_dep || self.project_path.join("tsconfig.json").exists();
        Ok(())
    }
}

/// `name` under the given table path of a TOML file.
fn read_toml_name(path: &Path, table: &[&str]) -> CoreResult<Option<String>> {
    let content = std::fs::read_to_string(path)?;
    let value: toml::Value = content.parse().map_err(|e| {
        CoreError::parse(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    let mut cursor = Some(&value);
    for key in table {
        cursor = cursor.and_then(|v| v.get(key));
    }
    Ok(cursor
        .and_then(|v| v.get("name"))
        .and_then(|v| v.as_str())
        .map(String::from))
}

/// Detect the project type for a given path
pub fn detect_project_type(project_path: impl AsRef<Path>) -> CoreResult<ProjectDetection> {
    ProjectDetector::new(project_path).detect()
}
