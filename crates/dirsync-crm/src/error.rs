//! CRM client error types.

use thiserror::Error;

/// Errors raised while talking to the CRM.
#[derive(Debug, Error)]
pub enum CrmError {
    /// The CRM answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The response body could not be decoded.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// A record the caller depends on is missing.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Client configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A bounded retry policy gave up.
    #[error("giving up after {attempts} attempt(s): {message}")]
    MaxAttemptsExceeded { attempts: u32, message: String },
}

impl CrmError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CrmError::Http { .. } | CrmError::Transport { .. })
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            CrmError::Http { .. } => "CRM_HTTP",
            CrmError::Transport { .. } => "CRM_TRANSPORT",
            CrmError::Decode { .. } => "CRM_DECODE",
            CrmError::NotFound { .. } => "CRM_NOT_FOUND",
            CrmError::InvalidConfig(_) => "CRM_INVALID_CONFIG",
            CrmError::MaxAttemptsExceeded { .. } => "CRM_MAX_ATTEMPTS",
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CrmError::NotFound { what: what.into() }
    }
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return CrmError::Decode {
                message: err.to_string(),
            };
        }
        CrmError::Transport {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CrmError {
    fn from(err: serde_json::Error) -> Self {
        CrmError::Decode {
            message: err.to_string(),
        }
    }
}

/// Result type for CRM operations.
pub type CrmResult<T> = Result<T, CrmError>;
