use std::sync::Arc;

use chrono::Utc;

use super::infra::InfraManager;
use super::validation;
use crate::database::{Project, ProjectRepository, StoreError};
use crate::error::ApiError;
use crate::types::{CreateProjectRequest, HealthResponse, ListProjectResponse, ProjectDetailResponse, ProjectView};

pub struct ProjectService {
    projects: Arc<dyn ProjectRepository>,
    infra: Arc<dyn InfraManager>,
}

impl ProjectService {
    pub fn new(projects: Arc<dyn ProjectRepository>, infra: Arc<dyn InfraManager>) -> Self {
        Self { projects, infra }
    }

    pub async fn create(&self, req: CreateProjectRequest, tenant_id: &str) -> Result<ProjectView, ApiError> {
        validation::validate_create_project(&req)?;

        let project = Project {
            id: req.id,
            name: req.name,
            tenant_id: tenant_id.to_string(),
            created_at: Utc::now(),
        };

        let created = self.projects.create_project(project).await.map_err(|err| match err {
            StoreError::Duplicate(_) => ApiError::bad_request("A project with that id already exists"),
            other => ApiError::from(other),
        })?;
        tracing::info!(project_id = %created.id, tenant_id, "Created project");

        Ok(ProjectView::from(&created))
    }

    pub async fn list(&self, tenant_id: &str) -> Result<ListProjectResponse, ApiError> {
        let projects = self.projects.list_by_tenant(tenant_id).await?;
        Ok(ListProjectResponse {
            tenant_id: tenant_id.to_string(),
            projects: projects.iter().map(ProjectView::from).collect(),
        })
    }

    pub async fn detail(&self, project_id: &str, tenant_id: &str) -> Result<ProjectDetailResponse, ApiError> {
        self.projects
            .find_with_config(project_id, tenant_id)
            .await?
            .map(ProjectDetailResponse::from)
            .ok_or_else(|| ApiError::not_found("Project not found"))
    }

    pub async fn health(&self, project_id: &str) -> Result<HealthResponse, ApiError> {
        let healthiness = self.infra.check_health(project_id).await?;
        Ok(HealthResponse {
            id: project_id.to_string(),
            healthiness,
        })
    }

    /// Drop every project, then restart deployments so they forget them
    pub async fn clear(&self) -> Result<(), ApiError> {
        self.projects.clear().await?;
        self.infra.restart_projects().await?;
        tracing::warn!("Cleared all projects");
        Ok(())
    }
}
