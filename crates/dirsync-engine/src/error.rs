//! Pass-level errors.
//!
//! Failures of individual directory writes never surface here: they are
//! logged, escalated and kept as diagnostics on the pass report.

use dirsync_crm::CrmError;
use dirsync_directory::DirectoryError;
use thiserror::Error;

/// Errors that abort a whole reconciliation pass.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The CRM snapshot could not be read.
    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    /// The directory could not be read at pass level.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// A category the pass depends on is not defined in the CRM.
    #[error("Category not defined in CRM: {name}")]
    MissingCategory { name: String },

    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl EngineError {
    pub fn missing_category(name: impl Into<String>) -> Self {
        EngineError::MissingCategory { name: name.into() }
    }

    /// Stable code used in incident subjects.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Crm(e) => e.error_code(),
            EngineError::Directory(e) => e.error_code(),
            EngineError::MissingCategory { .. } => "ENGINE_MISSING_CATEGORY",
            EngineError::InvalidConfiguration(_) => "ENGINE_INVALID_CONFIGURATION",
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
