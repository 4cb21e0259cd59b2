//! Logging Setup
//!
//! Installs the global `tracing` subscriber for the `refine` binary.
//! Library code only emits events and never calls this.

use tracing_subscriber::EnvFilter;

use crate::utils::error::{EngineError, EngineResult};

/// Output format of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Default filter: engine crates at `info` (or `debug` when verbose), the
/// rest at `warn`. `RUST_LOG` overrides both.
fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!(
        "warn,refine={level},refine_engine={level},refine_toolkit={level},refine_validation={level}"
    )
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Install the global subscriber. Logs go to stderr so JSON reports on
/// stdout stay machine-readable.
pub fn init_tracing(format: LogFormat, verbose: bool) -> EngineResult<()> {
    let filter = build_filter(verbose);
    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    result.map_err(|e| EngineError::internal(format!("tracing init failed: {e}")))
}
