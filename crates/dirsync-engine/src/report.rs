//! Pass report.

use serde::{Deserialize, Serialize};

use crate::statistics::PassStatistics;

/// A per-entry failure that did not stop the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// DN or CRM project the failure concerns.
    pub subject: String,
    /// `add`, `modify`, `delete`, `crm_update`, ...
    pub operation: String,
    pub error_code: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        subject: impl Into<String>,
        operation: impl Into<String>,
        error_code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            operation: operation.into(),
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassReport {
    pub statistics: PassStatistics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// Sanitized names of tenants linked from tenant-bearing projects.
    #[serde(default)]
    pub tenant_identifiers: Vec<String>,
}

impl PassReport {
    /// Whether every operation of the pass succeeded.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
