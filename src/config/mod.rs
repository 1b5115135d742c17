use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub upstream: UpstreamConfig,
    pub streaming: StreamingConfig,
    pub infra: InfraConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Port of the project configuration gRPC service
    pub grpc_port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// gRPC endpoint of the analytic service, e.g. http://queue-analytic:9090
    pub analytic_addr: String,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// When false every response is buffered and SSE routes report streaming unsupported
    pub enabled: bool,
    /// Body chunks buffered between a handler and a slow client before writes wait
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfraConfig {
    pub manager_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL; the in-memory store is used when absent
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Ten years
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set outside development")]
    MissingSecret,

    #[error("JWT expiry must be between 1 and 87600 hours")]
    InvalidJwtExpiry,

    #[error("streaming channel capacity must be at least 1")]
    InvalidChannelCapacity,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() && self.environment != Environment::Development {
            return Err(ConfigError::MissingSecret);
        }
        if self.security.jwt_expiry_hours == 0 || self.security.jwt_expiry_hours > MAX_JWT_EXPIRY_HOURS {
            return Err(ConfigError::InvalidJwtExpiry);
        }
        if self.streaming.channel_capacity == 0 {
            return Err(ConfigError::InvalidChannelCapacity);
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("DASHBOARD_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("GRPC_PORT") {
            self.server.grpc_port = v.parse().unwrap_or(self.server.grpc_port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_ISSUER") {
            self.security.jwt_issuer = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Upstream overrides
        if let Ok(v) = env::var("ANALYTIC_GRPC_ADDR") {
            self.upstream.analytic_addr = v;
        }
        if let Ok(v) = env::var("ANALYTIC_CONNECT_TIMEOUT_SECS") {
            self.upstream.connect_timeout_secs = v.parse().unwrap_or(self.upstream.connect_timeout_secs);
        }

        // Streaming overrides
        if let Ok(v) = env::var("API_ENABLE_STREAMING") {
            self.streaming.enabled = v.parse().unwrap_or(self.streaming.enabled);
        }
        if let Ok(v) = env::var("API_STREAM_CHANNEL_CAPACITY") {
            self.streaming.channel_capacity = v.parse().unwrap_or(self.streaming.channel_capacity);
        }

        // Infra overrides
        if let Ok(v) = env::var("INFRA_MANAGER_URL") {
            self.infra.manager_url = v.trim_end_matches('/').to_string();
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|url| !url.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8080,
                grpc_port: 9091,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                jwt_secret: "development-secret".to_string(),
                jwt_issuer: "rest".to_string(),
                jwt_expiry_hours: 24 * 5,
            },
            upstream: UpstreamConfig {
                analytic_addr: "http://localhost:9090".to_string(),
                connect_timeout_secs: 5,
            },
            streaming: StreamingConfig {
                enabled: true,
                channel_capacity: 16,
            },
            infra: InfraConfig {
                manager_url: "http://localhost:9000".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8080,
                grpc_port: 9090,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_issuer: "rest".to_string(),
                jwt_expiry_hours: 24 * 5,
            },
            upstream: UpstreamConfig {
                analytic_addr: "http://queue-analytic:9090".to_string(),
                connect_timeout_secs: 5,
            },
            streaming: StreamingConfig {
                enabled: true,
                channel_capacity: 32,
            },
            infra: InfraConfig {
                manager_url: "http://infra-manager".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8080,
                grpc_port: 9090,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_issuer: "rest".to_string(),
                jwt_expiry_hours: 24 * 5,
            },
            upstream: UpstreamConfig {
                analytic_addr: "http://queue-analytic:9090".to_string(),
                connect_timeout_secs: 3,
            },
            streaming: StreamingConfig {
                enabled: true,
                channel_capacity: 64,
            },
            infra: InfraConfig {
                manager_url: "http://infra-manager".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
            },
        }
    }
}
