pub mod configuration;
pub mod project;
pub mod tenant;

pub use configuration::{Configuration, ConfigurationUpdate};
pub use project::{Project, ProjectWithConfig};
pub use tenant::Tenant;
