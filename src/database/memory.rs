use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    Configuration, ConfigurationUpdate, Project, ProjectRepository, ProjectWithConfig, StoreError, Tenant,
    TenantRepository,
};

#[derive(Default)]
struct State {
    tenants: HashMap<String, Tenant>,
    projects: BTreeMap<String, Project>,
    configurations: HashMap<String, Configuration>,
}

/// Process-local store used when no database URL is configured
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantRepository for MemoryStore {
    async fn create_tenant(&self, tenant: Tenant) -> Result<Tenant, StoreError> {
        let mut state = self.state.write().await;
        if state.tenants.values().any(|t| t.email == tenant.email) {
            return Err(StoreError::Duplicate("Email".to_string()));
        }
        state.tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(tenant)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Tenant>, StoreError> {
        let state = self.state.read().await;
        Ok(state.tenants.values().find(|t| t.email == email).cloned())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn create_project(&self, project: Project) -> Result<Project, StoreError> {
        let mut state = self.state.write().await;
        if state.projects.contains_key(&project.id) {
            return Err(StoreError::Duplicate("Project".to_string()));
        }
        state
            .configurations
            .insert(project.id.clone(), Configuration::default_for(&project.id));
        state.projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<Project>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .projects
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_with_config(
        &self,
        project_id: &str,
        tenant_id: &str,
    ) -> Result<Option<ProjectWithConfig>, StoreError> {
        let state = self.state.read().await;
        let found = state
            .projects
            .get(project_id)
            .filter(|p| p.tenant_id == tenant_id)
            .zip(state.configurations.get(project_id))
            .map(|(project, configuration)| ProjectWithConfig {
                project: project.clone(),
                configuration: configuration.clone(),
            });
        Ok(found)
    }

    async fn find_config(&self, project_id: &str) -> Result<Option<Configuration>, StoreError> {
        let state = self.state.read().await;
        Ok(state.configurations.get(project_id).cloned())
    }

    async fn update_config(&self, update: &ConfigurationUpdate) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let configuration = state
            .configurations
            .get_mut(&update.project_id)
            .ok_or_else(|| StoreError::NotFound("Project".to_string()))?;
        configuration.apply(update, Utc::now());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.configurations.clear();
        state.projects.clear();
        Ok(())
    }
}
