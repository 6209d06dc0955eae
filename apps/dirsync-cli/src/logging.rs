//! Log subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the `--verbose` level decides.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::{CliError, CliResult};

/// Filter directive for a verbosity name, if the name is valid.
pub fn level_directive(verbosity: &str) -> Option<&'static str> {
    match verbosity.to_ascii_uppercase().as_str() {
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARNING" | "WARN" => Some("warn"),
        "ERROR" | "CRITICAL" => Some("error"),
        _ => None,
    }
}

fn filter_for(verbosity: &str) -> CliResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = level_directive(verbosity)
        .ok_or_else(|| CliError::Logging(format!("unknown verbosity {verbosity}")))?;
    EnvFilter::try_new(directive).map_err(|e| CliError::Logging(e.to_string()))
}

/// Install the global subscriber, writing to `log_file` (appending) or stderr.
pub fn init_logging(verbosity: &str, log_file: Option<&Path>) -> CliResult<()> {
    let filter = filter_for(verbosity)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| CliError::Logging(format!("{}: {e}", path.display())))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| CliError::Logging(e.to_string()))?;

    tracing::debug!(verbosity, "Logging initialized");
    Ok(())
}
