use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("infra manager request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("infra manager answered {0}")]
    Status(u16),

    #[error("project is not deployed")]
    ProjectNotFound,
}

impl From<InfraError> for ApiError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::ProjectNotFound => ApiError::not_found("Project not found"),
            other => {
                tracing::error!("Infra manager error: {}", other);
                ApiError::internal_server_error("Failed to reach infra manager")
            }
        }
    }
}

/// Deployment registration sent when a project's queue is configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraProject {
    pub project_id: String,
    pub project_domain: String,
    pub url_path: String,
}

/// Operations the dashboard needs from the cluster manager
#[async_trait]
pub trait InfraManager: Send + Sync {
    async fn check_health(&self, project_id: &str) -> Result<bool, InfraError>;

    async fn register_project(&self, project: &InfraProject) -> Result<(), InfraError>;

    /// Restart every project deployment
    async fn restart_projects(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: HealthData,
}

#[derive(Debug, Default, Deserialize)]
struct HealthData {
    #[serde(default)]
    healthiness: bool,
}

/// `InfraManager` over the manager's HTTP API
#[derive(Clone)]
pub struct HttpInfraManager {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInfraManager {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn ensure_ok(response: &reqwest::Response) -> Result<(), InfraError> {
    if response.status() != reqwest::StatusCode::OK {
        return Err(InfraError::Status(response.status().as_u16()));
    }
    Ok(())
}

#[async_trait]
impl InfraManager for HttpInfraManager {
    async fn check_health(&self, project_id: &str) -> Result<bool, InfraError> {
        let body: HealthBody = self
            .client
            .get(self.url(&format!("/kube/health/{}", project_id)))
            .send()
            .await?
            .json()
            .await?;

        if body.status == "failed" {
            return Err(InfraError::ProjectNotFound);
        }
        Ok(body.data.healthiness)
    }

    async fn register_project(&self, project: &InfraProject) -> Result<(), InfraError> {
        let response = self.client.post(self.url("/kube/project")).json(project).send().await?;
        ensure_ok(&response)
    }

    async fn restart_projects(&self) -> Result<(), InfraError> {
        let response = self.client.delete(self.url("/kube/restart/project")).send().await?;
        ensure_ok(&response)
    }
}
