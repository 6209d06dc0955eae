//! Status and stage updates pushed back to the CRM.

use std::collections::HashSet;
use std::sync::Arc;

use dirsync_crm::models::{Link, NewProject, PipelineStage, Project, ProjectStatus};
use dirsync_crm::{CrmClient, CrmResult};
use tracing::{debug, info};

use crate::classifier::next_stage;
use crate::model::ProjectDescriptor;

/// Writes project status, stage and default tenants to the CRM.
///
/// Every update reads the current record first and sends it back whole,
/// changing only what needs to change. Nothing is written when the record
/// already says what it should.
pub struct CrmStatusReporter {
    crm: Arc<dyn CrmClient>,
    stages: Vec<PipelineStage>,
    creation_stages: HashSet<i64>,
    tenant_category_id: i64,
}

impl CrmStatusReporter {
    pub fn new(
        crm: Arc<dyn CrmClient>,
        stages: Vec<PipelineStage>,
        creation_stages: HashSet<i64>,
        tenant_category_id: i64,
    ) -> Self {
        Self {
            crm,
            stages,
            creation_stages,
            tenant_category_id,
        }
    }

    /// Mark a created project as running and move it out of the creation band.
    ///
    /// Returns whether the CRM record changed.
    pub async fn report_running(&self, project_id: i64) -> CrmResult<bool> {
        self.report(project_id, ProjectStatus::InProgress, true)
            .await
    }

    /// Mark a deleted project or tenant as completed. The stage is left alone.
    pub async fn report_completed(&self, project_id: i64) -> CrmResult<bool> {
        self.report(project_id, ProjectStatus::Completed, false)
            .await
    }

    async fn report(
        &self,
        project_id: i64,
        status: ProjectStatus,
        advance_stage: bool,
    ) -> CrmResult<bool> {
        let mut project = self.crm.project(project_id).await?;
        let mut changed = false;

        if !project.has_status(status) {
            project.status = Some(status.to_string());
            changed = true;
        }

        if advance_stage {
            let next = project
                .stage_id
                .filter(|id| self.creation_stages.contains(id))
                .and_then(|id| next_stage(&self.stages, id));
            if let Some(next) = next {
                project.stage_id = Some(next.stage_id);
                changed = true;
            }
        }

        if !changed {
            debug!(project_id, status = %status, "CRM project already up to date");
            return Ok(false);
        }

        self.crm.update_project(&project).await?;
        info!(
            project_id,
            status = %status,
            stage_id = ?project.stage_id,
            "CRM project updated"
        );
        Ok(true)
    }

    /// Create the placeholder tenant project for `parent` and link it back.
    ///
    /// The placeholder is named after the parent's directory name, is
    /// `Deferred`, and copies the parent's custom fields and contact links
    /// (roles included), so the tenant it maps to has the parent's members.
    pub async fn create_default_tenant(&self, parent: &ProjectDescriptor) -> CrmResult<Project> {
        let mut parent_record = self.crm.project(parent.external_id).await?;

        let placeholder = NewProject {
            project_name: parent.cn.clone(),
            status: ProjectStatus::Deferred.to_string(),
            category_id: self.tenant_category_id,
            customfields: parent_record.customfields.clone(),
            links: parent_record
                .links
                .iter()
                .filter_map(|l| {
                    l.contact_id.map(|id| Link {
                        role: l.role.clone(),
                        ..Link::contact(id)
                    })
                })
                .collect(),
        };
        let created = self.crm.create_project(&placeholder).await?;

        parent_record.links.push(Link::project(created.project_id));
        self.crm.update_project(&parent_record).await?;

        info!(
            parent_id = parent.external_id,
            tenant_id = created.project_id,
            "Default tenant created in CRM"
        );
        Ok(created)
    }
}
