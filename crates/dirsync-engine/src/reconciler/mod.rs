//! # Directory Reconciler
//!
//! Brings the directory in line with a desired project tree.
//!
//! Each call names an [`Action`]; whether the project's entry is present
//! decides the [`Step`] taken. Writes go through a guarded writer so that a
//! failing entry is recorded and skipped while the rest of the pass goes on.
//!
//! - [`accounts`] - Account upsert and identifier allocation
//! - [`groups`] - Project and tenant group records and diffs
//! - [`tenants`] - Tenant children and default-tenant synthesis
//! - [`prune`] - Orphan account disabling and restoring
//! - [`writer`] - Guarded writes

pub mod accounts;
pub mod groups;
pub mod prune;
pub mod tenants;
pub mod writer;

use std::sync::Arc;

use dirsync_directory::{Directory, DirectoryError, DirectoryResult};
use dirsync_notify::IncidentSink;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::EngineConfig;
use crate::crm_status::CrmStatusReporter;
use crate::dispatcher::{NotificationDispatcher, NotificationEvent};
use crate::model::{AccountDescriptor, ProjectDescriptor};
use crate::report::Diagnostic;
use crate::statistics::{StatisticsTracker, SyncAction};

pub use writer::WriteOutcome;
use writer::GuardedWriter;

/// Requested reconciliation for one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => f.write_str("create"),
            Action::Update => f.write_str("update"),
            Action::Delete => f.write_str("delete"),
        }
    }
}

/// What to do with the project entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Add the entry with its tenants, then report and notify.
    CreateEntry,
    /// The entry exists; only accounts are refreshed.
    RefreshAccounts,
    /// Diff the entry and its tenants against the desired state.
    DiffEntry,
    /// Delete tenants, then the entry, then report completion.
    DeleteEntry,
    /// Nothing left to delete; completion is still reported.
    AlreadyAbsent,
}

/// Step for `action` given whether the project entry is present.
pub fn transition(action: Action, present: bool) -> Step {
    match (action, present) {
        (Action::Create, false) | (Action::Update, false) => Step::CreateEntry,
        (Action::Create, true) => Step::RefreshAccounts,
        (Action::Update, true) => Step::DiffEntry,
        (Action::Delete, true) => Step::DeleteEntry,
        (Action::Delete, false) => Step::AlreadyAbsent,
    }
}

/// Applies desired projects to the directory.
pub struct Reconciler {
    directory: Arc<dyn Directory>,
    config: EngineConfig,
    dispatcher: NotificationDispatcher,
    crm: CrmStatusReporter,
    writer: GuardedWriter,
    stats: Arc<StatisticsTracker>,
}

impl Reconciler {
    pub fn new(
        directory: Arc<dyn Directory>,
        config: EngineConfig,
        dispatcher: NotificationDispatcher,
        crm: CrmStatusReporter,
        incidents: Option<Arc<dyn IncidentSink>>,
    ) -> Self {
        let stats = Arc::new(StatisticsTracker::new());
        Self {
            writer: GuardedWriter::new(directory.clone(), incidents, stats.clone()),
            directory,
            config,
            dispatcher,
            crm,
            stats,
        }
    }

    pub fn statistics(&self) -> &StatisticsTracker {
        &self.stats
    }

    /// Record a directory failure outside any single project.
    pub async fn record_failure(
        &self,
        subject: &str,
        operation: &str,
        err: &DirectoryError,
    ) {
        self.writer
            .directory_failure(subject, operation, "", err)
            .await;
    }

    /// Failures recorded since the last call.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.writer.take_diagnostics()
    }

    /// Reconcile one project. Failures are recorded, never returned.
    #[instrument(skip(self, project), fields(project = %project.cn, project_id = project.external_id))]
    pub async fn apply(&self, action: Action, project: &ProjectDescriptor) {
        if self.reject_unnamed(&action.to_string(), project).await {
            return;
        }
        let result = match action {
            Action::Create => self.create(project).await,
            Action::Update => self.update(project).await,
            Action::Delete => self.delete(project).await,
        };
        if let Err(e) = result {
            let dn = self.config.layout.project_dn(&project.cn);
            self.writer
                .directory_failure(&dn, &action.to_string(), "", &e)
                .await;
        }
    }

    /// Refuse a project or tenant whose name sanitizes to nothing; its DN
    /// would collide with every other such entry.
    pub(crate) async fn reject_unnamed(
        &self,
        operation: &str,
        project: &ProjectDescriptor,
    ) -> bool {
        if !project.cn.is_empty() {
            return false;
        }
        self.writer
            .rejected(
                &format!("project {}", project.external_id),
                operation,
                "name has no directory-safe form",
            )
            .await;
        true
    }

    async fn create(&self, project: &ProjectDescriptor) -> DirectoryResult<()> {
        self.upsert_accounts(&project.members, project.account_role())
            .await;

        let dn = self.config.layout.project_dn(&project.cn);
        match transition(Action::Create, self.directory.exists(&dn).await?) {
            Step::RefreshAccounts => {
                debug!(dn = %dn, "Project already present");
                self.report_running(project.external_id).await;
                Ok(())
            }
            _ => self.create_project(project, &dn).await,
        }
    }

    async fn update(&self, project: &ProjectDescriptor) -> DirectoryResult<()> {
        self.upsert_accounts(&project.members, project.account_role())
            .await;

        let dn = self.config.layout.project_dn(&project.cn);
        match transition(Action::Update, self.directory.exists(&dn).await?) {
            Step::CreateEntry => {
                info!(dn = %dn, "Project missing on update, creating");
                self.create_project(project, &dn).await
            }
            _ => {
                let desired = self.group_entry(&dn, project).await?;
                if self.update_group(&desired, project).await? {
                    self.stats.record(SyncAction::ProjectUpdated);
                }
                if project.requires_tenants() {
                    self.reconcile_tenants(project).await?;
                }
                Ok(())
            }
        }
    }

    async fn delete(&self, project: &ProjectDescriptor) -> DirectoryResult<()> {
        let dn = self.config.layout.project_dn(&project.cn);
        let mut completed: Vec<i64> = Vec::new();

        if transition(Action::Delete, self.directory.exists(&dn).await?) == Step::DeleteEntry {
            for child in self.delete_tenants(&dn).await? {
                if !completed.contains(&child) {
                    completed.push(child);
                }
            }
            match self.writer.delete(&dn).await {
                WriteOutcome::Committed => self.stats.record(SyncAction::ProjectDeleted),
                WriteOutcome::Missing => {}
                _ => return Ok(()),
            }
        }

        for tenant in &project.tenants {
            if !completed.contains(&tenant.external_id) {
                completed.push(tenant.external_id);
            }
        }
        completed.push(project.external_id);
        for project_id in completed {
            self.report_completed(project_id).await;
        }
        Ok(())
    }

    /// Add the project entry; on commit create its tenants, report it
    /// running and tell its contacts.
    async fn create_project(&self, project: &ProjectDescriptor, dn: &str) -> DirectoryResult<()> {
        let entry = self.group_entry(dn, project).await?;
        if !self.writer.add(&entry).await.is_committed() {
            return Ok(());
        }
        self.stats.record(SyncAction::ProjectCreated);

        if project.requires_tenants() {
            self.create_tenants(project).await?;
        }
        self.report_running(project.external_id).await;

        for admin in project.admins.iter().filter(|a| !a.hidden) {
            self.notify(
                &admin.mails,
                NotificationEvent::ProjectReady {
                    admin_name: &admin.display_name,
                },
            )
            .await;
        }
        self.notify_accounts(
            &project.members,
            NotificationEvent::MemberAdded {
                target: &project.cn,
                tenant: false,
            },
        )
        .await;
        Ok(())
    }

    async fn report_running(&self, project_id: i64) {
        match self.crm.report_running(project_id).await {
            Ok(true) => self.stats.record(SyncAction::CrmUpdated),
            Ok(false) => {}
            Err(e) => self.writer.crm_failure(project_id, "report_running", &e).await,
        }
    }

    async fn report_completed(&self, project_id: i64) {
        match self.crm.report_completed(project_id).await {
            Ok(true) => self.stats.record(SyncAction::CrmUpdated),
            Ok(false) => {}
            Err(e) => self.writer.crm_failure(project_id, "report_completed", &e).await,
        }
    }

    async fn notify(&self, recipients: &[String], event: NotificationEvent<'_>) {
        let delivery = self.dispatcher.dispatch(recipients, event).await;
        for _ in 0..delivery.sent {
            self.stats.record(SyncAction::NotificationSent);
        }
        for _ in 0..delivery.failed {
            self.stats.record(SyncAction::NotificationFailed);
        }
    }

    /// Notify every non-hidden account.
    async fn notify_accounts(&self, accounts: &[AccountDescriptor], event: NotificationEvent<'_>) {
        for account in accounts.iter().filter(|a| !a.hidden) {
            self.notify(&account.mails, event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        assert_eq!(transition(Action::Create, false), Step::CreateEntry);
        assert_eq!(transition(Action::Create, true), Step::RefreshAccounts);
        assert_eq!(transition(Action::Update, false), Step::CreateEntry);
        assert_eq!(transition(Action::Update, true), Step::DiffEntry);
        assert_eq!(transition(Action::Delete, true), Step::DeleteEntry);
        assert_eq!(transition(Action::Delete, false), Step::AlreadyAbsent);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Update.to_string(), "update");
        assert_eq!(serde_json::to_value(Action::Delete).unwrap(), "delete");
    }
}
