//! Pipeline stage classification.
//!
//! Every CRM project lands in exactly one bucket per pass, decided by its
//! category, the order of its current stage in the configured pipeline, and
//! (for deletion) whether it is already completed.

use std::collections::{HashMap, HashSet};

use dirsync_crm::models::{Category as CrmCategory, Pipeline, PipelineStage, Project, ProjectStatus};
use serde::{Deserialize, Serialize};

use crate::config::{CategoryLabels, StageBands};
use crate::model::Category;

/// What a pass does with a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Create,
    Update,
    Delete,
    Ignore,
}

/// Ids of stages whose order is in `orders`, restricted to pipelines named `pipeline_name`.
pub fn stage_ids_in_band(
    orders: &[i64],
    stages: &[PipelineStage],
    pipelines: &[Pipeline],
    pipeline_name: &str,
) -> HashSet<i64> {
    let pipeline_ids: HashSet<i64> = pipelines
        .iter()
        .filter(|p| p.pipeline_name == pipeline_name)
        .map(|p| p.pipeline_id)
        .collect();

    stages
        .iter()
        .filter(|s| pipeline_ids.contains(&s.pipeline_id) && orders.contains(&s.stage_order))
        .map(|s| s.stage_id)
        .collect()
}

/// Stage following `stage_id` in the same pipeline.
pub fn next_stage(stages: &[PipelineStage], stage_id: i64) -> Option<&PipelineStage> {
    let current = stages.iter().find(|s| s.stage_id == stage_id)?;
    stages
        .iter()
        .find(|s| s.pipeline_id == current.pipeline_id && s.stage_order == current.stage_order + 1)
}

/// Buckets CRM projects by stage band.
#[derive(Debug, Clone)]
pub struct StageClassifier {
    create: HashSet<i64>,
    update: HashSet<i64>,
    delete: HashSet<i64>,
    categories: HashMap<i64, Category>,
}

impl StageClassifier {
    pub fn new(
        bands: &StageBands,
        stages: &[PipelineStage],
        pipelines: &[Pipeline],
        pipeline_name: &str,
        categories: &[CrmCategory],
        labels: &CategoryLabels,
    ) -> Self {
        Self {
            create: stage_ids_in_band(&bands.create, stages, pipelines, pipeline_name),
            update: stage_ids_in_band(&bands.update, stages, pipelines, pipeline_name),
            delete: stage_ids_in_band(&bands.delete, stages, pipelines, pipeline_name),
            categories: categories
                .iter()
                .filter_map(|c| {
                    labels
                        .category_of(&c.category_name)
                        .map(|kind| (c.category_id, kind))
                })
                .collect(),
        }
    }

    /// Engine category of a project, if it has one the engine reconciles.
    pub fn category(&self, project: &Project) -> Option<Category> {
        project
            .category_id
            .and_then(|id| self.categories.get(&id).copied())
    }

    /// CRM id of the category for `kind`.
    pub fn category_id(&self, kind: Category) -> Option<i64> {
        self.categories
            .iter()
            .find(|(_, c)| **c == kind)
            .map(|(id, _)| *id)
    }

    pub fn is_creation_stage(&self, stage_id: i64) -> bool {
        self.create.contains(&stage_id)
    }

    /// Bucket for one top-level project. Tenants are never classified on their own.
    pub fn classify(&self, project: &Project) -> Bucket {
        match self.category(project) {
            Some(Category::Tenant) | None => return Bucket::Ignore,
            Some(_) => {}
        }
        let Some(stage_id) = project.stage_id else {
            return Bucket::Ignore;
        };

        if self.create.contains(&stage_id) {
            Bucket::Create
        } else if self.update.contains(&stage_id) {
            Bucket::Update
        } else if self.delete.contains(&stage_id) && !project.has_status(ProjectStatus::Completed)
        {
            Bucket::Delete
        } else {
            Bucket::Ignore
        }
    }

    /// Projects of `category` in `bucket`, in input order.
    pub fn select<'a>(
        &self,
        projects: &'a [Project],
        bucket: Bucket,
        category: Category,
    ) -> Vec<&'a Project> {
        projects
            .iter()
            .filter(|p| self.category(p) == Some(category) && self.classify(p) == bucket)
            .collect()
    }

    /// All projects of the tenant category.
    pub fn tenant_pool<'a>(&self, projects: &'a [Project]) -> Vec<&'a Project> {
        projects
            .iter()
            .filter(|p| self.category(p) == Some(Category::Tenant))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages() -> Vec<PipelineStage> {
        let mut stages: Vec<PipelineStage> = (1..=7)
            .map(|order| PipelineStage::new(100 + order, 1, order))
            .collect();
        stages.extend((1..=7).map(|order| PipelineStage::new(200 + order, 2, order)));
        stages
    }

    fn pipelines() -> Vec<Pipeline> {
        vec![
            Pipeline::new(1, "Project execution"),
            Pipeline::new(2, "Sales"),
        ]
    }

    fn classifier() -> StageClassifier {
        StageClassifier::new(
            &StageBands::default(),
            &stages(),
            &pipelines(),
            "Project execution",
            &[
                CrmCategory::new(1, "SDA"),
                CrmCategory::new(2, "FPA"),
                CrmCategory::new(3, "FPA (CRA)"),
                CrmCategory::new(4, "OpenStack Tenant"),
                CrmCategory::new(5, "Consulting"),
            ],
            &CategoryLabels::default(),
        )
    }

    fn project(category: i64, stage: i64, status: Option<ProjectStatus>) -> Project {
        Project {
            project_id: stage,
            category_id: Some(category),
            stage_id: Some(stage),
            status: status.map(|s| s.to_string()),
            ..Project::default()
        }
    }

    #[test]
    fn test_stage_ids_in_band_restricted_to_pipeline() {
        let ids = stage_ids_in_band(&[5, 6], &stages(), &pipelines(), "Project execution");
        assert_eq!(ids, HashSet::from([105, 106]));
        assert!(stage_ids_in_band(&[4], &stages(), &pipelines(), "Nope").is_empty());
    }

    #[test]
    fn test_stage_banding() {
        let c = classifier();
        assert_eq!(c.classify(&project(1, 104, None)), Bucket::Create);
        assert_eq!(c.classify(&project(1, 105, None)), Bucket::Update);
        assert_eq!(c.classify(&project(1, 106, None)), Bucket::Update);
        assert_eq!(
            c.classify(&project(1, 107, Some(ProjectStatus::InProgress))),
            Bucket::Delete
        );
        assert_eq!(
            c.classify(&project(1, 107, Some(ProjectStatus::Completed))),
            Bucket::Ignore
        );
        assert_eq!(c.classify(&project(1, 103, None)), Bucket::Ignore);
    }

    #[test]
    fn test_other_pipelines_and_categories_ignored() {
        let c = classifier();
        assert_eq!(c.classify(&project(1, 204, None)), Bucket::Ignore);
        assert_eq!(c.classify(&project(5, 104, None)), Bucket::Ignore);
        assert_eq!(c.classify(&project(4, 104, None)), Bucket::Ignore);
        assert_eq!(c.classify(&Project::default()), Bucket::Ignore);
    }

    #[test]
    fn test_select_by_category() {
        let c = classifier();
        let projects = vec![
            project(1, 104, None),
            project(3, 104, None),
            project(4, 105, None),
        ];
        assert_eq!(c.select(&projects, Bucket::Create, Category::Sda).len(), 1);
        assert_eq!(c.select(&projects, Bucket::Create, Category::FpaCra).len(), 1);
        assert_eq!(c.select(&projects, Bucket::Create, Category::Fpa).len(), 0);
        assert_eq!(c.tenant_pool(&projects).len(), 1);
        assert_eq!(c.category_id(Category::Tenant), Some(4));
    }

    #[test]
    fn test_next_stage() {
        let stages = stages();
        assert_eq!(next_stage(&stages, 104).map(|s| s.stage_id), Some(105));
        assert_eq!(next_stage(&stages, 204).map(|s| s.stage_id), Some(205));
        assert!(next_stage(&stages, 107).is_none());
        assert!(next_stage(&stages, 999).is_none());
    }
}
