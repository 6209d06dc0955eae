//! Directory writes with the pass's failure policy applied.
//!
//! An add that finds the entry already there and a delete that finds it
//! gone are normal outcomes. Anything else is logged with the attempted
//! payload, escalated to the incident sink when one is configured, kept as
//! a diagnostic, and reported as [`WriteOutcome::Failed`] so the caller can
//! move on to the next entry.

use std::sync::{Arc, Mutex};

use dirsync_crm::CrmError;
use dirsync_directory::{Directory, DirectoryError, Entry, Modification};
use dirsync_notify::{Incident, IncidentSink, Severity};
use tracing::{error, info, warn};

use crate::report::Diagnostic;
use crate::statistics::{StatisticsTracker, SyncAction};

/// Result of one guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed,
    /// The add target already existed.
    AlreadyExists,
    /// The delete target was already gone.
    Missing,
    Failed,
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed)
    }
}

pub(crate) struct GuardedWriter {
    directory: Arc<dyn Directory>,
    incidents: Option<Arc<dyn IncidentSink>>,
    stats: Arc<StatisticsTracker>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

fn describe_entry(entry: &Entry) -> String {
    entry
        .attributes
        .iter()
        .map(|(name, values)| format!("{name}: {}", values.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_mods(mods: &[Modification]) -> String {
    mods.iter()
        .map(|m| match m {
            Modification::Add { attribute, values } => format!("add {attribute}: {values:?}"),
            Modification::Replace { attribute, values } => {
                format!("replace {attribute}: {values:?}")
            }
            Modification::Delete { attribute, values } => {
                format!("delete {attribute}: {values:?}")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl GuardedWriter {
    pub(crate) fn new(
        directory: Arc<dyn Directory>,
        incidents: Option<Arc<dyn IncidentSink>>,
        stats: Arc<StatisticsTracker>,
    ) -> Self {
        Self {
            directory,
            incidents,
            stats,
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn add(&self, entry: &Entry) -> WriteOutcome {
        match self.directory.add(entry).await {
            Ok(()) => {
                info!(dn = %entry.dn, "Entry added");
                WriteOutcome::Committed
            }
            Err(e) if e.is_already_exists() => {
                info!(dn = %entry.dn, "Entry already exists");
                WriteOutcome::AlreadyExists
            }
            Err(e) => {
                self.directory_failure(&entry.dn, "add", &describe_entry(entry), &e)
                    .await;
                WriteOutcome::Failed
            }
        }
    }

    pub(crate) async fn modify(&self, dn: &str, mods: &[Modification]) -> WriteOutcome {
        match self.directory.modify(dn, mods).await {
            Ok(()) => {
                info!(dn = %dn, changes = %describe_mods(mods), "Entry modified");
                WriteOutcome::Committed
            }
            Err(e) => {
                self.directory_failure(dn, "modify", &describe_mods(mods), &e)
                    .await;
                WriteOutcome::Failed
            }
        }
    }

    pub(crate) async fn delete(&self, dn: &str) -> WriteOutcome {
        match self.directory.delete(dn).await {
            Ok(()) => {
                info!(dn = %dn, "Entry deleted");
                WriteOutcome::Committed
            }
            Err(e) if e.is_no_such_object() => {
                info!(dn = %dn, "Entry already absent");
                WriteOutcome::Missing
            }
            Err(e) => {
                self.directory_failure(dn, "delete", "", &e).await;
                WriteOutcome::Failed
            }
        }
    }

    /// Record a failed directory operation (read or write).
    pub(crate) async fn directory_failure(
        &self,
        subject: &str,
        operation: &str,
        payload: &str,
        err: &DirectoryError,
    ) {
        error!(
            dn = %subject,
            operation,
            payload,
            error = %err,
            error_code = err.error_code(),
            "Directory operation failed"
        );
        self.stats.record(SyncAction::DirectoryFailed);
        self.escalate(Diagnostic::new(
            subject,
            operation,
            err.error_code(),
            err.to_string(),
        ))
        .await;
    }

    /// Record an entry refused before reaching the directory.
    pub(crate) async fn rejected(&self, subject: &str, operation: &str, reason: &str) {
        error!(subject, operation, reason, "Entry rejected");
        self.stats.record(SyncAction::EntryRejected);
        self.escalate(Diagnostic::new(subject, operation, "INVALID_NAME", reason))
            .await;
    }

    /// Record a failed CRM write.
    pub(crate) async fn crm_failure(&self, project_id: i64, operation: &str, err: &CrmError) {
        error!(
            project_id,
            operation,
            error = %err,
            error_code = err.error_code(),
            "CRM update failed"
        );
        self.stats.record(SyncAction::CrmFailed);
        self.escalate(Diagnostic::new(
            format!("project {project_id}"),
            operation,
            err.error_code(),
            err.to_string(),
        ))
        .await;
    }

    async fn escalate(&self, diagnostic: Diagnostic) {
        if let Some(sink) = &self.incidents {
            let incident = Incident::new(
                format!("{} {} failed", diagnostic.operation, diagnostic.subject),
                format!("{}: {}", diagnostic.error_code, diagnostic.message),
                Severity::Critical,
            );
            if let Err(e) = sink.file(&incident).await {
                warn!(error = %e, "Failed to file incident");
            }
        }
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(diagnostic);
    }

    pub(crate) fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsync_directory::MemoryDirectory;
    use dirsync_notify::RecordingIncidentSink;

    const BASE: &str = "ou=accounts,dc=example,dc=org";

    fn writer(
        directory: Arc<MemoryDirectory>,
        sink: Option<Arc<RecordingIncidentSink>>,
    ) -> (GuardedWriter, Arc<StatisticsTracker>) {
        let stats = Arc::new(StatisticsTracker::new());
        let sink = sink.map(|s| s as Arc<dyn IncidentSink>);
        (GuardedWriter::new(directory, sink, stats.clone()), stats)
    }

    #[tokio::test]
    async fn test_add_twice_swallows_already_exists() {
        let directory = Arc::new(MemoryDirectory::with_roots([BASE]));
        let (writer, stats) = writer(directory.clone(), None);
        let entry = Entry::new(format!("cn=a,{BASE}")).with("cn", ["a"]);

        assert_eq!(writer.add(&entry).await, WriteOutcome::Committed);
        assert_eq!(writer.add(&entry).await, WriteOutcome::AlreadyExists);
        assert_eq!(directory.mutation_count(), 1);
        assert!(writer.take_diagnostics().is_empty());
        assert_eq!(stats.count(SyncAction::DirectoryFailed), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_failure() {
        let directory = Arc::new(MemoryDirectory::with_roots([BASE]));
        let (writer, _) = writer(directory, None);
        assert_eq!(
            writer.delete(&format!("cn=gone,{BASE}")).await,
            WriteOutcome::Missing
        );
        assert!(writer.take_diagnostics().is_empty());
    }

    #[tokio::test]
    async fn test_failure_escalated_and_recorded() {
        let directory = Arc::new(MemoryDirectory::with_roots([BASE]));
        let dn = format!("cn=locked,{BASE}");
        directory.fail_writes_to(&dn);
        let sink = Arc::new(RecordingIncidentSink::new());
        let (writer, stats) = writer(directory, Some(sink.clone()));

        let outcome = writer
            .add(&Entry::new(dn.clone()).with("cn", ["locked"]))
            .await;
        assert_eq!(outcome, WriteOutcome::Failed);
        assert_eq!(stats.count(SyncAction::DirectoryFailed), 1);

        let filed = sink.filed();
        assert_eq!(filed.len(), 1);
        assert_eq!(filed[0].severity, Severity::Critical);
        assert!(filed[0].subject.contains(&dn));

        let diagnostics = writer.take_diagnostics();
        assert_eq!(diagnostics[0].operation, "add");
        assert!(writer.take_diagnostics().is_empty());
    }

    #[tokio::test]
    async fn test_missing_parent_is_failure() {
        let directory = Arc::new(MemoryDirectory::with_roots([BASE]));
        let (writer, _) = writer(directory, None);
        let outcome = writer
            .add(&Entry::new("cn=x,ou=nowhere,dc=example,dc=org").with("cn", ["x"]))
            .await;
        assert_eq!(outcome, WriteOutcome::Failed);
    }

    #[tokio::test]
    async fn test_rejected_entry_is_recorded_without_writing() {
        let directory = Arc::new(MemoryDirectory::with_roots([BASE]));
        let sink = Arc::new(RecordingIncidentSink::new());
        let (writer, stats) = writer(directory.clone(), Some(sink.clone()));

        writer.rejected("project 30", "create", "name has no directory-safe form").await;

        assert_eq!(directory.mutation_count(), 0);
        assert_eq!(stats.count(SyncAction::EntryRejected), 1);
        assert_eq!(sink.filed().len(), 1);
        let diagnostics = writer.take_diagnostics();
        assert_eq!(diagnostics[0].error_code, "INVALID_NAME");
        assert_eq!(diagnostics[0].subject, "project 30");
    }
}
