//! Incident filing.
//!
//! Unexpected directory errors and pass-level failures are filed as tickets.
//! Filing is best-effort: callers log a failed filing and carry on.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::{NotifyError, NotifyResult};

/// Incident priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    High,
    Urgent,
    /// Pass-level failures.
    Critical,
}

impl Severity {
    /// Redmine's default priority ids.
    pub fn redmine_priority_id(&self) -> u8 {
        match self {
            Severity::Normal => 2,
            Severity::High => 3,
            Severity::Urgent => 4,
            Severity::Critical => 5,
        }
    }
}

/// Something worth a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub subject: String,
    pub body: String,
    pub severity: Severity,
}

impl Incident {
    pub fn new(subject: impl Into<String>, body: impl Into<String>, severity: Severity) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            severity,
        }
    }
}

/// Files incidents somewhere a human will see them.
#[async_trait]
pub trait IncidentSink: Send + Sync {
    async fn file(&self, incident: &Incident) -> NotifyResult<()>;
}

/// Redmine issue tracker settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct RedmineConfig {
    pub api_key: String,
    #[serde(default = "default_redmine_url")]
    pub base_url: String,
    #[serde(default = "default_redmine_project")]
    pub project: String,
}

impl std::fmt::Debug for RedmineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedmineConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .finish()
    }
}

fn default_redmine_url() -> String {
    "https://support.forgeservicelab.fi/redmine".to_string()
}

fn default_redmine_project() -> String {
    "support".to_string()
}

impl RedmineConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_redmine_url(),
            project: default_redmine_project(),
        }
    }
}

/// Files incidents as Redmine issues.
pub struct RedmineIncidentSink {
    config: RedmineConfig,
    client: reqwest::Client,
}

impl RedmineIncidentSink {
    pub fn new(config: RedmineConfig) -> NotifyResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("redmine api key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::InvalidConfig(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn issues_url(&self) -> String {
        format!("{}/issues.json", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl IncidentSink for RedmineIncidentSink {
    async fn file(&self, incident: &Incident) -> NotifyResult<()> {
        let payload = json!({
            "issue": {
                "project_id": self.config.project,
                "subject": incident.subject,
                "description": incident.body,
                "priority_id": incident.severity.redmine_priority_id(),
            }
        });

        let response = self
            .client
            .post(self.issues_url())
            .header("X-Redmine-API-Key", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(NotifyError::Http { status, body });
        }

        info!(subject = %incident.subject, severity = ?incident.severity, "Incident filed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ids_ordered() {
        assert!(Severity::Critical > Severity::High);
        assert_eq!(Severity::Normal.redmine_priority_id(), 2);
        assert_eq!(Severity::Critical.redmine_priority_id(), 5);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(RedmineIncidentSink::new(RedmineConfig::new("")).is_err());
    }

    #[test]
    fn test_issues_url() {
        let mut config = RedmineConfig::new("k");
        config.base_url = "https://tracker.example.org/".into();
        let sink = RedmineIncidentSink::new(config).unwrap();
        assert_eq!(sink.issues_url(), "https://tracker.example.org/issues.json");
    }
}
