use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::auth::TokenIssuer;
use crate::database::MemoryStore;
use crate::services::{AuthService, ConfigurationService, InfraError, InfraManager, InfraProject, ProjectService};

/// Infra manager double that records calls. Every project is healthy except `unknown`.
#[derive(Default)]
pub struct RecordingInfra {
    registered: Mutex<Vec<InfraProject>>,
    restarts: Mutex<usize>,
}

impl RecordingInfra {
    pub fn registered(&self) -> Vec<InfraProject> {
        self.registered.lock().unwrap().clone()
    }

    pub fn restarts(&self) -> usize {
        *self.restarts.lock().unwrap()
    }
}

#[async_trait]
impl InfraManager for RecordingInfra {
    async fn check_health(&self, project_id: &str) -> Result<bool, InfraError> {
        if project_id == "unknown" {
            return Err(InfraError::ProjectNotFound);
        }
        Ok(true)
    }

    async fn register_project(&self, project: &InfraProject) -> Result<(), InfraError> {
        self.registered.lock().unwrap().push(project.clone());
        Ok(())
    }

    async fn restart_projects(&self) -> Result<(), InfraError> {
        *self.restarts.lock().unwrap() += 1;
        Ok(())
    }
}

/// Services wired over one in-memory store and a recording infra manager
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub infra: Arc<RecordingInfra>,
}

impl TestContext {
    pub const SECRET: &'static str = "service-test-secret";

    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            infra: Arc::new(RecordingInfra::default()),
        }
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.store.clone(), TokenIssuer::new(Self::SECRET, "rest", 1))
    }

    pub fn project_service(&self) -> ProjectService {
        ProjectService::new(self.store.clone(), self.infra.clone())
    }

    pub fn configuration_service(&self) -> ConfigurationService {
        ConfigurationService::new(self.store.clone(), self.infra.clone())
    }
}
