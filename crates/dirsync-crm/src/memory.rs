//! In-memory CRM.
//!
//! Holds a snapshot of records and applies writes to it, recording every
//! write so callers can assert on what was pushed back.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::CrmClient;
use crate::error::{CrmError, CrmResult};
use crate::models::{Category, Contact, NewProject, Pipeline, PipelineStage, Project};

/// A write that reached the in-memory CRM.
#[derive(Debug, Clone, PartialEq)]
pub enum CrmWrite {
    Updated(Project),
    Created(Project),
}

#[derive(Default)]
struct State {
    projects: Vec<Project>,
    contacts: Vec<Contact>,
    categories: Vec<Category>,
    pipelines: Vec<Pipeline>,
    stages: Vec<PipelineStage>,
    writes: Vec<CrmWrite>,
    next_id: i64,
}

/// CRM held in memory.
#[derive(Default)]
pub struct MemoryCrm {
    state: Mutex<State>,
}

impl MemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        self.lock().projects = projects;
        self
    }

    pub fn with_contacts(self, contacts: Vec<Contact>) -> Self {
        self.lock().contacts = contacts;
        self
    }

    pub fn with_categories(self, categories: Vec<Category>) -> Self {
        self.lock().categories = categories;
        self
    }

    pub fn with_pipelines(self, pipelines: Vec<Pipeline>) -> Self {
        self.lock().pipelines = pipelines;
        self
    }

    pub fn with_stages(self, stages: Vec<PipelineStage>) -> Self {
        self.lock().stages = stages;
        self
    }

    /// Insert or replace a project by id.
    pub fn put_project(&self, project: Project) {
        let mut state = self.lock();
        match state
            .projects
            .iter_mut()
            .find(|p| p.project_id == project.project_id)
        {
            Some(existing) => *existing = project,
            None => state.projects.push(project),
        }
    }

    /// Insert or replace a contact by id.
    pub fn put_contact(&self, contact: Contact) {
        let mut state = self.lock();
        match state
            .contacts
            .iter_mut()
            .find(|c| c.contact_id == contact.contact_id)
        {
            Some(existing) => *existing = contact,
            None => state.contacts.push(contact),
        }
    }

    pub fn get_project(&self, project_id: i64) -> Option<Project> {
        self.lock()
            .projects
            .iter()
            .find(|p| p.project_id == project_id)
            .cloned()
    }

    pub fn writes(&self) -> Vec<CrmWrite> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }
}

#[async_trait]
impl CrmClient for MemoryCrm {
    async fn projects(&self) -> CrmResult<Vec<Project>> {
        Ok(self.lock().projects.clone())
    }

    async fn project(&self, project_id: i64) -> CrmResult<Project> {
        self.get_project(project_id)
            .ok_or_else(|| CrmError::not_found(format!("project {project_id}")))
    }

    async fn contacts(&self) -> CrmResult<Vec<Contact>> {
        Ok(self.lock().contacts.clone())
    }

    async fn categories(&self) -> CrmResult<Vec<Category>> {
        Ok(self.lock().categories.clone())
    }

    async fn pipelines(&self) -> CrmResult<Vec<Pipeline>> {
        Ok(self.lock().pipelines.clone())
    }

    async fn pipeline_stages(&self) -> CrmResult<Vec<PipelineStage>> {
        Ok(self.lock().stages.clone())
    }

    async fn update_project(&self, project: &Project) -> CrmResult<Project> {
        let mut state = self.lock();
        let existing = state
            .projects
            .iter_mut()
            .find(|p| p.project_id == project.project_id)
            .ok_or_else(|| CrmError::not_found(format!("project {}", project.project_id)))?;
        *existing = project.clone();
        state.writes.push(CrmWrite::Updated(project.clone()));
        Ok(project.clone())
    }

    async fn create_project(&self, project: &NewProject) -> CrmResult<Project> {
        let mut state = self.lock();
        let max_id = state.projects.iter().map(|p| p.project_id).max().unwrap_or(0);
        state.next_id = state.next_id.max(max_id) + 1;

        let created = Project {
            project_id: state.next_id,
            project_name: project.project_name.clone(),
            status: Some(project.status.clone()),
            category_id: Some(project.category_id),
            customfields: project.customfields.clone(),
            links: project.links.clone(),
            ..Project::default()
        };
        state.projects.push(created.clone());
        state.writes.push(CrmWrite::Created(created.clone()));
        Ok(created)
    }
}
