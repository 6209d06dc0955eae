//! Reconciler tests, one action at a time.
//!
//! Covers:
//! - Create idempotence (second create writes and sends nothing)
//! - Update with an absent entry falling back to create
//! - Delete of an absent project still reporting completion
//! - CRM failures recorded as diagnostics without undoing directory work

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::*;
use dirsync_crm::models::{Contact, Project, ProjectStatus};
use dirsync_crm::MemoryCrm;
use dirsync_directory::MemoryDirectory;
use dirsync_engine::config::EngineConfig;
use dirsync_engine::crm_status::CrmStatusReporter;
use dirsync_engine::dispatcher::NotificationDispatcher;
use dirsync_engine::mapper::DesiredStateMapper;
use dirsync_engine::model::{Category, ProjectDescriptor};
use dirsync_engine::reconciler::{Action, Reconciler};
use dirsync_engine::statistics::SyncAction;
use dirsync_notify::RecordingMailer;

// =============================================================================
// Fixtures
// =============================================================================

struct Harness {
    directory: Arc<MemoryDirectory>,
    crm: Arc<MemoryCrm>,
    mailer: Arc<RecordingMailer>,
    config: EngineConfig,
}

impl Harness {
    fn new(projects: Vec<Project>, contacts: Vec<Contact>) -> Self {
        let config = EngineConfig::new(BASE_DN);
        let directory = MemoryDirectory::with_roots([
            BASE_DN.to_string(),
            config.layout.accounts_dn(),
            config.layout.projects_dn(),
        ]);
        Self {
            directory: Arc::new(directory),
            crm: Arc::new(
                standard_crm()
                    .with_projects(projects)
                    .with_contacts(contacts),
            ),
            mailer: Arc::new(RecordingMailer::new()),
            config,
        }
    }

    /// A fresh reconciler, as a new pass would build one.
    fn reconciler(&self) -> Reconciler {
        let stages = (1..=7)
            .map(|order| {
                dirsync_crm::models::PipelineStage::new(stage(order), PIPELINE_ID, order)
            })
            .collect();
        let reporter = CrmStatusReporter::new(
            self.crm.clone(),
            stages,
            HashSet::from([stage(4)]),
            TENANT,
        );
        Reconciler::new(
            self.directory.clone(),
            self.config.clone(),
            NotificationDispatcher::new(self.mailer.clone()),
            reporter,
            None,
        )
    }

    fn descriptor(&self, project_id: i64, category: Category) -> ProjectDescriptor {
        let project = self.crm.get_project(project_id).unwrap();
        let contacts = contacts();
        let mapper = DesiredStateMapper::new(&contacts, &self.config.roles);
        mapper
            .map_projects(&[&project], &[category], None)
            .remove(0)
    }
}

fn contacts() -> Vec<Contact> {
    vec![person(1, "Jean", "Dupont"), person(2, "Anna", "Dupont")]
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_twice_writes_once() {
    let harness = Harness::new(
        vec![project(30, "Beta Lab", FPA, 4, vec![tech(1), admin(2)])],
        contacts(),
    );
    let desired = harness.descriptor(30, Category::Fpa);

    let first = harness.reconciler();
    first.apply(Action::Create, &desired).await;
    assert_eq!(first.statistics().count(SyncAction::ProjectCreated), 1);
    assert_eq!(first.statistics().count(SyncAction::AccountCreated), 2);
    assert!(first.take_diagnostics().is_empty());
    let mutations = harness.directory.mutation_count();
    let mails = harness.mailer.count();
    assert_eq!(mutations, 3);

    let second = harness.reconciler();
    second.apply(Action::Create, &desired).await;
    assert_eq!(harness.directory.mutation_count(), mutations);
    assert_eq!(harness.mailer.count(), mails);
    assert_eq!(second.statistics().snapshot().mutations(), 0);
    assert!(second.take_diagnostics().is_empty());

    // The stage moved once and stays put.
    let record = harness.crm.get_project(30).unwrap();
    assert_eq!(record.stage_id, Some(stage(5)));
    assert!(record.has_status(ProjectStatus::InProgress));
}

#[tokio::test]
async fn test_update_creates_absent_entry() {
    let harness = Harness::new(
        vec![project(30, "Beta Lab", FPA, 5, vec![tech(1)])],
        contacts(),
    );
    let desired = harness.descriptor(30, Category::Fpa);

    let reconciler = harness.reconciler();
    reconciler.apply(Action::Update, &desired).await;

    assert!(harness
        .directory
        .contains(&harness.config.layout.project_dn("Beta.Lab")));
    assert_eq!(reconciler.statistics().count(SyncAction::ProjectCreated), 1);
    assert_eq!(reconciler.statistics().count(SyncAction::ProjectUpdated), 0);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_absent_project_reports_completion() {
    let mut record = project(30, "Beta Lab", FPA, 7, vec![tech(1)]);
    record.status = Some("In Progress".to_string());
    let harness = Harness::new(vec![record], contacts());
    let desired = harness.descriptor(30, Category::Fpa);

    let reconciler = harness.reconciler();
    reconciler.apply(Action::Delete, &desired).await;

    assert_eq!(harness.directory.mutation_count(), 0);
    let record = harness.crm.get_project(30).unwrap();
    assert!(record.has_status(ProjectStatus::Completed));
    assert_eq!(record.stage_id, Some(stage(7)));
    assert_eq!(reconciler.statistics().count(SyncAction::CrmUpdated), 1);
}

// =============================================================================
// CRM Failures
// =============================================================================

#[tokio::test]
async fn test_crm_failure_is_a_diagnostic() {
    // The project exists in the descriptor but not in the CRM.
    let harness = Harness::new(
        vec![project(30, "Beta Lab", FPA, 4, vec![tech(1)])],
        contacts(),
    );
    let mut desired = harness.descriptor(30, Category::Fpa);
    desired.external_id = 31;

    let reconciler = harness.reconciler();
    reconciler.apply(Action::Create, &desired).await;

    assert!(harness
        .directory
        .contains(&harness.config.layout.project_dn("Beta.Lab")));
    let diagnostics = reconciler.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].subject, "project 31");
    assert_eq!(diagnostics[0].operation, "report_running");
    assert_eq!(reconciler.statistics().count(SyncAction::CrmFailed), 1);
}
