//! CRM client configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CrmError, CrmResult};

/// Default Insightly API root.
pub const DEFAULT_BASE_URL: &str = "https://api.insight.ly/v2.1";

/// Settings for [`crate::client::InsightlyClient`].
#[derive(Clone, Serialize, Deserialize)]
pub struct InsightlyConfig {
    /// API key, sent as the basic-auth user name.
    pub api_key: String,

    /// API root, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Pause between read retries, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Attempt limit for reads; unset means retry until success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_read_attempts: Option<u32>,
}

impl std::fmt::Debug for InsightlyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightlyConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("max_read_attempts", &self.max_read_attempts)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_backoff_ms() -> u64 {
    100
}

impl InsightlyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
            retry_backoff_ms: default_backoff_ms(),
            max_read_attempts: None,
        }
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound read retries.
    #[must_use]
    pub fn with_max_read_attempts(mut self, attempts: u32) -> Self {
        self.max_read_attempts = Some(attempts);
        self
    }

    pub fn validate(&self) -> CrmResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(CrmError::InvalidConfig("api_key is required".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CrmError::InvalidConfig(format!(
                "base_url must be an http(s) URL: {}",
                self.base_url
            )));
        }
        Ok(())
    }
}
