pub mod auth_service;
pub mod configuration_service;
pub mod infra;
pub mod project_service;
pub mod validation;

pub use auth_service::AuthService;
pub use configuration_service::ConfigurationService;
pub use infra::{HttpInfraManager, InfraError, InfraManager, InfraProject};
pub use project_service::ProjectService;
