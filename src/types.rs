/// Request and response bodies of the dashboard API
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::database::{Configuration, Project, ProjectWithConfig, Tenant};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTenantRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub retype_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantView {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<&Tenant> for TenantView {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id.clone(),
            email: tenant.email.clone(),
            name: tenant.name.clone(),
        }
    }
}

/// Returned by register and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub tenant: TenantView,
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateProjectRequest {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
}

impl From<&Project> for ProjectView {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            tenant_id: project.tenant_id.clone(),
            name: project.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListProjectResponse {
    pub tenant_id: String,
    pub projects: Vec<ProjectView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfigView {
    pub project_id: String,
    pub threshold: i32,
    pub session_time: i32,
    pub host: String,
    pub base_url: String,
    pub max_users_in_queue: i32,
    pub queue_start: Option<NaiveDateTime>,
    pub queue_end: Option<NaiveDateTime>,
    pub queue_page_style: String,
    pub queue_html_page: String,
    pub queue_page_base_color: String,
    pub queue_page_title: String,
    pub queue_page_logo: String,
    pub is_configure: bool,
}

impl From<Configuration> for ProjectConfigView {
    fn from(config: Configuration) -> Self {
        Self {
            project_id: config.project_id,
            threshold: config.threshold,
            session_time: config.session_time,
            host: config.host.unwrap_or_default(),
            base_url: config.base_url.unwrap_or_default(),
            max_users_in_queue: config.max_users_in_queue,
            queue_start: config.queue_start,
            queue_end: config.queue_end,
            queue_page_style: config.queue_page_style,
            queue_html_page: config.queue_html_page.unwrap_or_default(),
            queue_page_base_color: config.queue_page_base_color.unwrap_or_default(),
            queue_page_title: config.queue_page_title.unwrap_or_default(),
            queue_page_logo: config.queue_page_logo.unwrap_or_default(),
            is_configure: config.is_configure,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetailResponse {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub configuration: ProjectConfigView,
}

impl From<ProjectWithConfig> for ProjectDetailResponse {
    fn from(row: ProjectWithConfig) -> Self {
        Self {
            id: row.project.id,
            tenant_id: row.project.tenant_id,
            name: row.project.name,
            configuration: row.configuration.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub id: String,
    pub healthiness: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProjectConfigRequest {
    pub project_id: String,
    pub threshold: i32,
    pub session_time: i32,
    pub host: String,
    pub base_url: String,
    pub max_users_in_queue: i32,
    /// `YYYY-MM-DDTHH:MM:SS`, no zone
    pub queue_start: String,
    pub queue_end: String,
}
