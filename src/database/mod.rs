pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use models::{Configuration, ConfigurationUpdate, Project, ProjectWithConfig, Tenant};
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Insert a tenant; a taken email is `Duplicate`
    async fn create_tenant(&self, tenant: Tenant) -> Result<Tenant, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Tenant>, StoreError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert a project together with its default configuration
    async fn create_project(&self, project: Project) -> Result<Project, StoreError>;

    /// Projects of one tenant ordered by id
    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<Project>, StoreError>;

    /// Project and configuration, only if the project belongs to `tenant_id`
    async fn find_with_config(
        &self,
        project_id: &str,
        tenant_id: &str,
    ) -> Result<Option<ProjectWithConfig>, StoreError>;

    async fn find_config(&self, project_id: &str) -> Result<Option<Configuration>, StoreError>;

    /// Overwrite queue settings; an unknown project is `NotFound`
    async fn update_config(&self, update: &ConfigurationUpdate) -> Result<(), StoreError>;

    /// Remove every project and configuration
    async fn clear(&self) -> Result<(), StoreError>;
}
