//! Directory error types
//!
//! Errors carry the LDAP result code where one exists so callers can tell
//! expected conditions (entry already exists, no such object) apart from
//! genuine failures.

use thiserror::Error;

/// LDAP result code: noSuchAttribute.
pub const RC_NO_SUCH_ATTRIBUTE: u32 = 16;
/// LDAP result code: noSuchObject.
pub const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code: invalidCredentials.
pub const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: insufficientAccessRights.
pub const RC_INSUFFICIENT_ACCESS: u32 = 50;
/// LDAP result code: busy.
pub const RC_BUSY: u32 = 51;
/// LDAP result code: unavailable.
pub const RC_UNAVAILABLE: u32 = 52;
/// LDAP result code: notAllowedOnNonLeaf.
pub const RC_NOT_ALLOWED_ON_NON_LEAF: u32 = 66;
/// LDAP result code: entryAlreadyExists.
pub const RC_ALREADY_EXISTS: u32 = 68;

/// Error that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    // Connection errors (usually transient)
    /// Failed to establish or keep the directory session.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// Server reported itself busy or unavailable.
    #[error("directory unavailable: {message}")]
    Unavailable { message: String },

    // Authentication errors (permanent)
    /// Bind credentials were rejected.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// Bound identity may not perform the operation.
    #[error("insufficient access rights on {dn}")]
    InsufficientAccess { dn: String },

    // Configuration errors (permanent)
    /// Directory configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Entry-level conditions
    /// An entry with this DN already exists.
    #[error("entry already exists: {dn}")]
    AlreadyExists { dn: String },

    /// The entry (or its parent) does not exist.
    #[error("no such object: {dn}")]
    NoSuchObject { dn: String },

    /// Delete refused because the entry still has children.
    #[error("operation not allowed on non-leaf entry: {dn}")]
    NotAllowedOnNonLeaf { dn: String },

    /// Any other failure reported by the server.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        result_code: Option<u32>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DirectoryError {
    /// Check if this error is transient.
    ///
    /// The reconciler never retries directory calls itself; this is used only
    /// to classify diagnostics.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. }
                | DirectoryError::ConnectionTimeout { .. }
                | DirectoryError::Unavailable { .. }
        )
    }

    /// Check if this error is permanent.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// True for the swallowable "already exists" outcome of an add.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, DirectoryError::AlreadyExists { .. })
    }

    /// True when the target entry is missing.
    pub fn is_no_such_object(&self) -> bool {
        matches!(self, DirectoryError::NoSuchObject { .. })
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            DirectoryError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            DirectoryError::Unavailable { .. } => "UNAVAILABLE",
            DirectoryError::AuthenticationFailed => "AUTH_FAILED",
            DirectoryError::InsufficientAccess { .. } => "INSUFFICIENT_ACCESS",
            DirectoryError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            DirectoryError::AlreadyExists { .. } => "ALREADY_EXISTS",
            DirectoryError::NoSuchObject { .. } => "NO_SUCH_OBJECT",
            DirectoryError::NotAllowedOnNonLeaf { .. } => "NOT_ALLOWED_ON_NON_LEAF",
            DirectoryError::OperationFailed { .. } => "OPERATION_FAILED",
        }
    }

    /// Classify a non-success LDAP result code against the DN it concerned.
    pub fn from_result_code(rc: u32, dn: &str, text: &str) -> Self {
        match rc {
            RC_ALREADY_EXISTS => DirectoryError::AlreadyExists { dn: dn.to_string() },
            RC_NO_SUCH_OBJECT => DirectoryError::NoSuchObject { dn: dn.to_string() },
            RC_NOT_ALLOWED_ON_NON_LEAF => DirectoryError::NotAllowedOnNonLeaf { dn: dn.to_string() },
            RC_INSUFFICIENT_ACCESS => DirectoryError::InsufficientAccess { dn: dn.to_string() },
            RC_INVALID_CREDENTIALS => DirectoryError::AuthenticationFailed,
            RC_BUSY | RC_UNAVAILABLE => DirectoryError::Unavailable {
                message: format!("rc={rc} on {dn}: {text}"),
            },
            _ => DirectoryError::OperationFailed {
                message: format!("rc={rc} on {dn}: {text}"),
                result_code: Some(rc),
                source: None,
            },
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            result_code: None,
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            result_code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        DirectoryError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
