//! Whole-pass orchestration.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use dirsync_crm::models::{Category as CrmCategory, Contact, Pipeline, PipelineStage, Project};
use dirsync_crm::{CrmClient, CrmResult};
use dirsync_directory::Directory;
use dirsync_notify::{IncidentSink, Mailer};
use tracing::{info, instrument};

use crate::classifier::{Bucket, StageClassifier};
use crate::config::EngineConfig;
use crate::crm_status::CrmStatusReporter;
use crate::dispatcher::NotificationDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::mapper::DesiredStateMapper;
use crate::model::Category;
use crate::reconciler::{Action, Reconciler};
use crate::report::PassReport;
use crate::sanitize::sanitize;

/// Everything a pass reads from the CRM, fetched up front.
#[derive(Debug, Clone, Default)]
pub struct CrmSnapshot {
    pub stages: Vec<PipelineStage>,
    pub pipelines: Vec<Pipeline>,
    pub categories: Vec<CrmCategory>,
    pub projects: Vec<Project>,
    pub contacts: Vec<Contact>,
}

impl CrmSnapshot {
    pub async fn fetch(crm: &dyn CrmClient) -> CrmResult<Self> {
        Ok(Self {
            stages: crm.pipeline_stages().await?,
            pipelines: crm.pipelines().await?,
            categories: crm.categories().await?,
            projects: crm.projects().await?,
            contacts: crm.contacts().await?,
        })
    }
}

/// Sanitized names of the projects linked from tenant-bearing projects.
pub fn tenant_identifiers(snapshot: &CrmSnapshot, classifier: &StageClassifier) -> Vec<String> {
    let linked: BTreeSet<i64> = snapshot
        .projects
        .iter()
        .filter(|p| classifier.category(p).is_some_and(|c| c.has_tenants()))
        .flat_map(|p| p.linked_project_ids())
        .collect();

    let names: BTreeSet<String> = snapshot
        .projects
        .iter()
        .filter(|p| linked.contains(&p.project_id))
        .map(|p| sanitize(&p.project_name))
        .collect();
    names.into_iter().collect()
}

/// Runs reconciliation passes.
pub struct SyncEngine {
    directory: Arc<dyn Directory>,
    crm: Arc<dyn CrmClient>,
    mailer: Arc<dyn Mailer>,
    incidents: Option<Arc<dyn IncidentSink>>,
    config: EngineConfig,
}

impl SyncEngine {
    pub fn new(
        directory: Arc<dyn Directory>,
        crm: Arc<dyn CrmClient>,
        mailer: Arc<dyn Mailer>,
        config: EngineConfig,
    ) -> Self {
        Self {
            directory,
            crm,
            mailer,
            incidents: None,
            config,
        }
    }

    /// File per-entry failures with `sink`.
    pub fn with_incident_sink(mut self, sink: Arc<dyn IncidentSink>) -> Self {
        self.incidents = Some(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// One full pass: classify, then create, update and delete, then prune.
    ///
    /// Only failures that make the pass meaningless are returned; per-entry
    /// failures end up in the report's diagnostics.
    #[instrument(skip(self))]
    pub async fn run_pass(&self) -> EngineResult<PassReport> {
        self.config.validate()?;

        let snapshot = CrmSnapshot::fetch(self.crm.as_ref()).await?;
        let classifier = StageClassifier::new(
            &self.config.bands,
            &snapshot.stages,
            &snapshot.pipelines,
            &self.config.pipeline_name,
            &snapshot.categories,
            &self.config.categories,
        );
        let tenant_category_id = classifier
            .category_id(Category::Tenant)
            .ok_or_else(|| EngineError::missing_category(&self.config.categories.tenant))?;

        let projects_dn = self.config.layout.projects_dn();
        if !self.directory.exists(&projects_dn).await? {
            return Err(EngineError::InvalidConfiguration(format!(
                "projects subtree {projects_dn} does not exist"
            )));
        }

        let creation_stages = snapshot
            .stages
            .iter()
            .map(|s| s.stage_id)
            .filter(|id| classifier.is_creation_stage(*id))
            .collect();
        let reporter = CrmStatusReporter::new(
            self.crm.clone(),
            snapshot.stages.clone(),
            creation_stages,
            tenant_category_id,
        );
        let reconciler = Reconciler::new(
            self.directory.clone(),
            self.config.clone(),
            NotificationDispatcher::new(self.mailer.clone()),
            reporter,
            self.incidents.clone(),
        );

        let mapper = DesiredStateMapper::new(&snapshot.contacts, &self.config.roles);
        let pool = classifier.tenant_pool(&snapshot.projects);

        for (bucket, action) in [
            (Bucket::Create, Action::Create),
            (Bucket::Update, Action::Update),
            (Bucket::Delete, Action::Delete),
        ] {
            for category in Category::PROJECTS {
                let raw = classifier.select(&snapshot.projects, bucket, category);
                reconciler
                    .statistics()
                    .record_bucket(&action.to_string(), raw.len() as u32);
                let tenant_pool = category.has_tenants().then_some(pool.as_slice());

                for project in mapper.map_projects(&raw, &[category], tenant_pool) {
                    reconciler.apply(action, &project).await;
                }
            }
        }

        let hidden: HashSet<i64> = snapshot
            .contacts
            .iter()
            .filter(|c| c.is_hidden())
            .map(|c| c.contact_id)
            .collect();
        if let Err(e) = reconciler.prune(&hidden).await {
            reconciler
                .record_failure(&self.config.layout.accounts_dn(), "prune", &e)
                .await;
        }

        let report = PassReport {
            statistics: reconciler.statistics().snapshot(),
            diagnostics: reconciler.take_diagnostics(),
            tenant_identifiers: tenant_identifiers(&snapshot, &classifier),
        };
        info!(
            projects = reconciler.statistics().projects_seen(),
            mutations = report.statistics.mutations(),
            failures = report.statistics.failures(),
            "Reconciliation pass finished"
        );
        Ok(report)
    }
}
