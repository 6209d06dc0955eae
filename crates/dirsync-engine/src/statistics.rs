//! Pass statistics.
//!
//! Counts what a pass did, broken down by action.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;
use std::time::Instant;

/// Something a pass did (or failed to do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    AccountCreated,
    AccountUpdated,
    AccountDisabled,
    AccountRestored,
    ProjectCreated,
    ProjectUpdated,
    ProjectDeleted,
    TenantCreated,
    TenantUpdated,
    TenantDeleted,
    DefaultTenantSynthesized,
    NotificationSent,
    NotificationFailed,
    CrmUpdated,
    CrmFailed,
    DirectoryFailed,
    /// A project or tenant skipped before any write, e.g. for an empty name.
    EntryRejected,
}

impl SyncAction {
    pub const ALL: [SyncAction; 17] = [
        SyncAction::AccountCreated,
        SyncAction::AccountUpdated,
        SyncAction::AccountDisabled,
        SyncAction::AccountRestored,
        SyncAction::ProjectCreated,
        SyncAction::ProjectUpdated,
        SyncAction::ProjectDeleted,
        SyncAction::TenantCreated,
        SyncAction::TenantUpdated,
        SyncAction::TenantDeleted,
        SyncAction::DefaultTenantSynthesized,
        SyncAction::NotificationSent,
        SyncAction::NotificationFailed,
        SyncAction::CrmUpdated,
        SyncAction::CrmFailed,
        SyncAction::DirectoryFailed,
        SyncAction::EntryRejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::AccountCreated => "account_created",
            SyncAction::AccountUpdated => "account_updated",
            SyncAction::AccountDisabled => "account_disabled",
            SyncAction::AccountRestored => "account_restored",
            SyncAction::ProjectCreated => "project_created",
            SyncAction::ProjectUpdated => "project_updated",
            SyncAction::ProjectDeleted => "project_deleted",
            SyncAction::TenantCreated => "tenant_created",
            SyncAction::TenantUpdated => "tenant_updated",
            SyncAction::TenantDeleted => "tenant_deleted",
            SyncAction::DefaultTenantSynthesized => "default_tenant_synthesized",
            SyncAction::NotificationSent => "notification_sent",
            SyncAction::NotificationFailed => "notification_failed",
            SyncAction::CrmUpdated => "crm_updated",
            SyncAction::CrmFailed => "crm_failed",
            SyncAction::DirectoryFailed => "directory_failed",
            SyncAction::EntryRejected => "entry_rejected",
        }
    }

    /// Whether the action is a directory mutation.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            SyncAction::AccountCreated
                | SyncAction::AccountUpdated
                | SyncAction::AccountDisabled
                | SyncAction::AccountRestored
                | SyncAction::ProjectCreated
                | SyncAction::ProjectUpdated
                | SyncAction::ProjectDeleted
                | SyncAction::TenantCreated
                | SyncAction::TenantUpdated
                | SyncAction::TenantDeleted
        )
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics for one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassStatistics {
    /// Projects seen per bucket.
    #[serde(default)]
    pub projects_by_bucket: HashMap<String, u32>,
    /// Actions taken broken down by type.
    #[serde(default)]
    pub actions: HashMap<String, u32>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl PassStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self, action: SyncAction) -> u32 {
        self.actions.get(action.as_str()).copied().unwrap_or(0)
    }

    /// Total directory mutations committed.
    #[must_use]
    pub fn mutations(&self) -> u32 {
        SyncAction::ALL
            .iter()
            .filter(|a| a.is_mutation())
            .map(|a| self.count(*a))
            .sum()
    }

    /// Failed or rejected directory writes, notifications and CRM updates.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.count(SyncAction::DirectoryFailed)
            + self.count(SyncAction::EntryRejected)
            + self.count(SyncAction::NotificationFailed)
            + self.count(SyncAction::CrmFailed)
    }

    pub fn merge(&mut self, other: &PassStatistics) {
        for (key, value) in &other.projects_by_bucket {
            *self.projects_by_bucket.entry(key.clone()).or_insert(0) += value;
        }
        for (key, value) in &other.actions {
            *self.actions.entry(key.clone()).or_insert(0) += value;
        }
        self.duration_ms += other.duration_ms;
    }
}

/// Accumulates statistics while a pass runs.
pub struct StatisticsTracker {
    projects_seen: AtomicU32,
    projects_by_bucket: RwLock<HashMap<String, u32>>,
    actions: RwLock<HashMap<SyncAction, u32>>,
    start_time: Instant,
}

impl StatisticsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            projects_seen: AtomicU32::new(0),
            projects_by_bucket: RwLock::new(HashMap::new()),
            actions: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    pub fn record_bucket(&self, bucket: &str, count: u32) {
        self.projects_seen.fetch_add(count, Ordering::SeqCst);
        if let Ok(mut map) = self.projects_by_bucket.write() {
            *map.entry(bucket.to_string()).or_insert(0) += count;
        }
    }

    pub fn record(&self, action: SyncAction) {
        if let Ok(mut map) = self.actions.write() {
            *map.entry(action).or_insert(0) += 1;
        }
    }

    #[must_use]
    pub fn count(&self, action: SyncAction) -> u32 {
        self.actions
            .read()
            .map(|map| map.get(&action).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    #[must_use]
    pub fn projects_seen(&self) -> u32 {
        self.projects_seen.load(Ordering::SeqCst)
    }

    /// Snapshot as [`PassStatistics`].
    #[must_use]
    pub fn snapshot(&self) -> PassStatistics {
        let actions = self
            .actions
            .read()
            .map(|map| {
                map.iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();
        let projects_by_bucket = self
            .projects_by_bucket
            .read()
            .map(|map| map.clone())
            .unwrap_or_default();

        PassStatistics {
            projects_by_bucket,
            actions,
            duration_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }
}

impl Default for StatisticsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_snapshot() {
        let tracker = StatisticsTracker::new();
        tracker.record_bucket("create", 2);
        tracker.record(SyncAction::AccountCreated);
        tracker.record(SyncAction::AccountCreated);
        tracker.record(SyncAction::ProjectCreated);
        tracker.record(SyncAction::NotificationSent);
        tracker.record(SyncAction::DirectoryFailed);

        let stats = tracker.snapshot();
        assert_eq!(tracker.projects_seen(), 2);
        assert_eq!(stats.count(SyncAction::AccountCreated), 2);
        assert_eq!(stats.mutations(), 3);
        assert_eq!(stats.failures(), 1);
        assert_eq!(stats.projects_by_bucket.get("create"), Some(&2));
    }

    #[test]
    fn test_merge() {
        let mut a = PassStatistics::new();
        a.actions.insert("account_created".into(), 1);
        let mut b = PassStatistics::new();
        b.actions.insert("account_created".into(), 2);
        b.actions.insert("project_deleted".into(), 1);

        a.merge(&b);
        assert_eq!(a.count(SyncAction::AccountCreated), 3);
        assert_eq!(a.count(SyncAction::ProjectDeleted), 1);
    }

    #[test]
    fn test_serialization_keys() {
        let json = serde_json::to_value(SyncAction::DefaultTenantSynthesized).unwrap();
        assert_eq!(json, "default_tenant_synthesized");
        assert_eq!(
            SyncAction::DefaultTenantSynthesized.to_string(),
            "default_tenant_synthesized"
        );
    }
}
