//! Shared fixtures for the engine integration tests.
//!
//! A [`World`] wires the engine to an in-memory directory, an in-memory CRM
//! with the standard pipeline and categories, and recording mail and
//! incident sinks.

#![allow(dead_code)]

use std::sync::Arc;

use dirsync_crm::memory::MemoryCrm;
use dirsync_crm::models::{Category, Contact, Link, Pipeline, PipelineStage, Project};
use dirsync_directory::{Entry, MemoryDirectory};
use dirsync_engine::config::EngineConfig;
use dirsync_engine::report::PassReport;
use dirsync_engine::SyncEngine;
use dirsync_notify::{RecordingIncidentSink, RecordingMailer};

pub const BASE_DN: &str = "dc=forgeservicelab,dc=fi";

pub const SDA: i64 = 1;
pub const FPA: i64 = 2;
pub const FPA_CRA: i64 = 3;
pub const TENANT: i64 = 4;

pub const PIPELINE_ID: i64 = 1;

/// Stage id of the given order in the "Project execution" pipeline.
pub fn stage(order: i64) -> i64 {
    100 + order
}

pub fn tech(contact_id: i64) -> Link {
    role_link(contact_id, "Technical contact")
}

pub fn admin(contact_id: i64) -> Link {
    role_link(contact_id, "Administrative contact")
}

pub fn member(contact_id: i64) -> Link {
    Link::contact(contact_id)
}

fn role_link(contact_id: i64, role: &str) -> Link {
    Link {
        role: Some(role.to_string()),
        ..Link::contact(contact_id)
    }
}

/// Contact with an `<first>@example.org` address.
pub fn person(id: i64, first: &str, last: &str) -> Contact {
    Contact::new(id, first, last).with_email(&format!("{}@example.org", first.to_lowercase()))
}

/// Pipeline project, not started.
pub fn project(id: i64, name: &str, category: i64, stage_order: i64, links: Vec<Link>) -> Project {
    Project {
        project_id: id,
        project_name: name.to_string(),
        status: Some("Not Started".to_string()),
        category_id: Some(category),
        pipeline_id: Some(PIPELINE_ID),
        stage_id: Some(stage(stage_order)),
        links,
        ..Project::default()
    }
}

/// Tenant project, outside any pipeline.
pub fn tenant(id: i64, name: &str, links: Vec<Link>) -> Project {
    Project {
        project_id: id,
        project_name: name.to_string(),
        status: Some("Deferred".to_string()),
        category_id: Some(TENANT),
        links,
        ..Project::default()
    }
}

pub fn standard_crm() -> MemoryCrm {
    let mut stages: Vec<PipelineStage> = (1..=7)
        .map(|order| PipelineStage::new(stage(order), PIPELINE_ID, order))
        .collect();
    stages.extend((1..=7).map(|order| PipelineStage::new(200 + order, 2, order)));

    MemoryCrm::new()
        .with_stages(stages)
        .with_pipelines(vec![
            Pipeline::new(PIPELINE_ID, "Project execution"),
            Pipeline::new(2, "Sales"),
        ])
        .with_categories(vec![
            Category::new(SDA, "SDA"),
            Category::new(FPA, "FPA"),
            Category::new(FPA_CRA, "FPA (CRA)"),
            Category::new(TENANT, "OpenStack Tenant"),
        ])
}

pub struct World {
    pub directory: Arc<MemoryDirectory>,
    pub crm: Arc<MemoryCrm>,
    pub mailer: Arc<RecordingMailer>,
    pub incidents: Arc<RecordingIncidentSink>,
    pub config: EngineConfig,
}

impl World {
    pub fn new(projects: Vec<Project>, contacts: Vec<Contact>) -> Self {
        Self::with_crm(
            standard_crm()
                .with_projects(projects)
                .with_contacts(contacts),
        )
    }

    pub fn with_crm(crm: MemoryCrm) -> Self {
        let config = EngineConfig::new(BASE_DN);
        let directory = MemoryDirectory::with_roots([
            BASE_DN.to_string(),
            config.layout.accounts_dn(),
            config.layout.projects_dn(),
        ]);
        Self {
            directory: Arc::new(directory),
            crm: Arc::new(crm),
            mailer: Arc::new(RecordingMailer::new()),
            incidents: Arc::new(RecordingIncidentSink::new()),
            config,
        }
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(
            self.directory.clone(),
            self.crm.clone(),
            self.mailer.clone(),
            self.config.clone(),
        )
        .with_incident_sink(self.incidents.clone())
    }

    pub async fn pass(&self) -> PassReport {
        self.engine().run_pass().await.unwrap()
    }

    /// Forget recorded mutations, mail and CRM writes.
    pub fn reset_records(&self) {
        self.directory.clear_mutations();
        self.mailer.clear();
        self.crm.clear_writes();
    }

    pub fn account_dn(&self, cn: &str) -> String {
        self.config.layout.account_dn(cn)
    }

    pub fn project_dn(&self, cn: &str) -> String {
        self.config.layout.project_dn(cn)
    }

    pub fn tenant_dn(&self, project_cn: &str, tenant_cn: &str) -> String {
        self.config.layout.tenant_dn(project_cn, tenant_cn)
    }

    pub fn account(&self, cn: &str) -> Entry {
        self.directory
            .get(&self.account_dn(cn))
            .unwrap_or_else(|| panic!("account {cn} missing"))
    }

    /// Account names present under the accounts subtree.
    pub fn account_names(&self) -> Vec<String> {
        let accounts_dn = self.config.layout.accounts_dn();
        self.directory
            .entries()
            .into_iter()
            .filter(|e| e.has_value("objectClass", "inetOrgPerson"))
            .filter(|e| e.dn.to_lowercase().ends_with(&accounts_dn.to_lowercase()))
            .filter_map(|e| e.first("cn").map(str::to_string))
            .collect()
    }
}
