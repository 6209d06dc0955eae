//! Notification error types.

use thiserror::Error;

/// Errors raised while delivering mail or filing incidents.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Recipient or sender address does not parse.
    #[error("invalid address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    /// Message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(String),

    /// SMTP delivery failed.
    #[error("smtp delivery failed: {0}")]
    Smtp(String),

    /// Incident endpoint answered with an error status.
    #[error("incident sink returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Incident endpoint unreachable.
    #[error("incident sink transport error: {0}")]
    Transport(String),

    /// Sender configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NotifyError {
    pub fn error_code(&self) -> &'static str {
        match self {
            NotifyError::InvalidAddress { .. } => "INVALID_ADDRESS",
            NotifyError::Build(_) => "BUILD_FAILED",
            NotifyError::Smtp(_) => "SMTP_FAILED",
            NotifyError::Http { .. } => "INCIDENT_HTTP",
            NotifyError::Transport(_) => "INCIDENT_TRANSPORT",
            NotifyError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

/// Result type for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
