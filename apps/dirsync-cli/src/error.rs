//! CLI error types and exit codes

use dirsync_crm::CrmError;
use dirsync_directory::DirectoryError;
use dirsync_engine::EngineError;
use dirsync_notify::NotifyError;
use thiserror::Error;

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: The pass could not run
/// - 2: Configuration error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    #[error("Notification setup failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("Synchronization failed: {0}")]
    Engine(#[from] EngineError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Logging(_) | CliError::Notify(_) => 2,
            CliError::Directory(_) | CliError::Crm(_) | CliError::Engine(_) => 1,
        }
    }

    /// Short machine-readable classification, used as the incident subject.
    pub fn error_code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "CLI_CONFIG",
            CliError::Logging(_) => "CLI_LOGGING",
            CliError::Directory(e) => e.error_code(),
            CliError::Crm(e) => e.error_code(),
            CliError::Notify(e) => e.error_code(),
            CliError::Engine(e) => e.error_code(),
        }
    }

    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(ConfigError::Missing(_)) => {
                Some("Pass the option on the command line or add it to the --resources file.")
            }
            CliError::Engine(EngineError::MissingCategory { .. }) => {
                Some("Check the project categories configured in the CRM.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config(ConfigError::Missing("bind")).exit_code(), 2);
        assert_eq!(CliError::Logging("x".into()).exit_code(), 2);
        assert_eq!(
            CliError::Engine(EngineError::InvalidConfiguration("x".into())).exit_code(),
            1
        );
    }

    #[test]
    fn test_error_code_delegates() {
        let err = CliError::from(EngineError::missing_category("OpenStack Tenant"));
        assert_eq!(err.error_code(), "ENGINE_MISSING_CATEGORY");
        assert!(err.suggestion().is_some());
    }
}
