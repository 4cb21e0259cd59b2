//! Build Gate Selection
//!
//! Maps a detected project type to the command that proves the project
//! still builds. Running the command is the caller's job.

use serde::{Deserialize, Serialize};

use crate::detector::{ProjectDetection, ProjectType};

/// A build/compile command as an argv list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildGate {
    pub program: String,
    pub args: Vec<String>,
    pub description: String,
}

impl BuildGate {
    pub fn new(program: &str, args: &[&str], description: &str) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            description: description.to_string(),
        }
    }

    /// Build a gate from an explicit argv list; `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            description: argv.join(" "),
        })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Build gate for a detected project, or `None` when the type is unknown.
pub fn build_gate_for(detection: &ProjectDetection) -> Option<BuildGate> {
    match detection.project_type {
        ProjectType::NodeJs if detection.has_build_script => {
            Some(BuildGate::new("npm", &["run", "build"], "npm build script"))
        }
        ProjectType::NodeJs if detection.has_typescript => Some(BuildGate::new(
            "npx",
            &["tsc", "--noEmit"],
            "TypeScript type check",
        )),
        ProjectType::NodeJs => None,
        ProjectType::Rust => Some(BuildGate::new("cargo", &["check", "--quiet"], "cargo check")),
        ProjectType::Python => Some(BuildGate::new(
            "python",
            &["-m", "compileall", "-q", "."],
            "Python byte-compile",
        )),
        ProjectType::Go => Some(BuildGate::new("go", &["build", "./..."], "go build")),
        ProjectType::Unknown => None,
    }
}
