//! Insightly HTTP client (reqwest-based).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::config::InsightlyConfig;
use crate::error::{CrmError, CrmResult};
use crate::models::{Category, Contact, NewProject, Pipeline, PipelineStage, Project};
use crate::retry::RetryPolicy;

/// Read and write access to the CRM records the sync needs.
#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn projects(&self) -> CrmResult<Vec<Project>>;

    async fn project(&self, project_id: i64) -> CrmResult<Project>;

    async fn contacts(&self) -> CrmResult<Vec<Contact>>;

    async fn categories(&self) -> CrmResult<Vec<Category>>;

    async fn pipelines(&self) -> CrmResult<Vec<Pipeline>>;

    async fn pipeline_stages(&self) -> CrmResult<Vec<PipelineStage>>;

    /// Replace a project with the given full record.
    async fn update_project(&self, project: &Project) -> CrmResult<Project>;

    async fn create_project(&self, project: &NewProject) -> CrmResult<Project>;
}

/// Client for the Insightly v2.1 REST API.
#[derive(Clone)]
pub struct InsightlyClient {
    base_url: String,
    api_key: String,
    http_client: Client,
    retry: RetryPolicy,
}

impl std::fmt::Debug for InsightlyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightlyClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

impl InsightlyClient {
    /// Build a client from configuration.
    pub fn new(config: &InsightlyConfig) -> CrmResult<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("dirsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CrmError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        let backoff = Duration::from_millis(config.retry_backoff_ms);
        let retry = match config.max_read_attempts {
            Some(max) => RetryPolicy::bounded(backoff, max),
            None => RetryPolicy::unbounded(backoff),
        };

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http_client,
            retry,
        })
    }

    /// Base URL in use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }

    async fn check(url: &str, response: Response) -> CrmResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CrmError::Http {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        })
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> CrmResult<T> {
        debug!("CRM GET {}", url);
        let response = self
            .http_client
            .get(url)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?;
        let response = Self::check(url, response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GET with the read retry policy.
    async fn get<T: DeserializeOwned>(&self, resource: &str) -> CrmResult<T> {
        let url = self.url(resource);
        self.retry
            .execute(&format!("GET {resource}"), || self.get_once(&url))
            .await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        resource: &str,
        body: &B,
    ) -> CrmResult<T> {
        let url = self.url(resource);
        debug!("CRM {} {}", method, url);
        let response = self
            .http_client
            .request(method, &url)
            .basic_auth(&self.api_key, Some(""))
            .json(body)
            .send()
            .await?;
        let response = Self::check(&url, response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CrmClient for InsightlyClient {
    async fn projects(&self) -> CrmResult<Vec<Project>> {
        self.get("Projects").await
    }

    async fn project(&self, project_id: i64) -> CrmResult<Project> {
        self.get(&format!("Projects/{project_id}")).await
    }

    async fn contacts(&self) -> CrmResult<Vec<Contact>> {
        self.get("Contacts").await
    }

    async fn categories(&self) -> CrmResult<Vec<Category>> {
        self.get("ProjectCategories").await
    }

    async fn pipelines(&self) -> CrmResult<Vec<Pipeline>> {
        self.get("Pipelines").await
    }

    async fn pipeline_stages(&self) -> CrmResult<Vec<PipelineStage>> {
        self.get("PipelineStages").await
    }

    async fn update_project(&self, project: &Project) -> CrmResult<Project> {
        let updated: Project = self
            .send_json(reqwest::Method::PUT, "Projects", project)
            .await?;
        info!(
            project_id = updated.project_id,
            status = ?updated.status,
            stage_id = ?updated.stage_id,
            "CRM project updated"
        );
        Ok(updated)
    }

    async fn create_project(&self, project: &NewProject) -> CrmResult<Project> {
        let created: Project = self
            .send_json(reqwest::Method::POST, "Projects", project)
            .await?;
        info!(
            project_id = created.project_id,
            name = %created.project_name,
            "CRM project created"
        );
        Ok(created)
    }
}
