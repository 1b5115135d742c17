use std::sync::Arc;

use chrono::NaiveDateTime;

use super::infra::{InfraManager, InfraProject};
use super::validation::MALFORMED_REQUEST;
use crate::database::{ConfigurationUpdate, ProjectRepository};
use crate::error::ApiError;
use crate::types::UpdateProjectConfigRequest;

/// Layout of `queue_start` / `queue_end`
pub const QUEUE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct ConfigurationService {
    projects: Arc<dyn ProjectRepository>,
    infra: Arc<dyn InfraManager>,
}

impl ConfigurationService {
    pub fn new(projects: Arc<dyn ProjectRepository>, infra: Arc<dyn InfraManager>) -> Self {
        Self { projects, infra }
    }

    /// Store queue settings and register the deployment with the infra manager.
    ///
    /// Nothing is written when registration fails.
    pub async fn update(&self, req: UpdateProjectConfigRequest) -> Result<(), ApiError> {
        if req.project_id.is_empty() {
            return Err(ApiError::bad_request(MALFORMED_REQUEST));
        }

        let queue_start = NaiveDateTime::parse_from_str(&req.queue_start, QUEUE_TIME_FORMAT)
            .map_err(|_| ApiError::bad_request("Invalid queue start time format"))?;
        let queue_end = NaiveDateTime::parse_from_str(&req.queue_end, QUEUE_TIME_FORMAT)
            .map_err(|_| ApiError::bad_request("Invalid queue end time format"))?;

        if self.projects.find_config(&req.project_id).await?.is_none() {
            return Err(ApiError::not_found("Project not found"));
        }

        self.infra
            .register_project(&InfraProject {
                project_id: req.project_id.clone(),
                project_domain: req.host.clone(),
                url_path: req.base_url.clone(),
            })
            .await?;

        let update = ConfigurationUpdate {
            project_id: req.project_id,
            threshold: req.threshold,
            session_time: req.session_time,
            host: req.host,
            base_url: req.base_url,
            max_users_in_queue: req.max_users_in_queue,
            queue_start,
            queue_end,
        };
        self.projects.update_config(&update).await?;
        tracing::info!(project_id = %update.project_id, "Updated project configuration");

        Ok(())
    }
}
