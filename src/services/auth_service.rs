use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::validation;
use crate::auth::TokenIssuer;
use crate::database::{StoreError, Tenant, TenantRepository};
use crate::error::ApiError;
use crate::types::{AuthResponse, CreateTenantRequest, LoginRequest, TenantView};

const BAD_CREDENTIALS: &str = "Email or password is incorrect";

/// Tenant registration and login
pub struct AuthService {
    tenants: Arc<dyn TenantRepository>,
    issuer: TokenIssuer,
}

impl AuthService {
    pub fn new(tenants: Arc<dyn TenantRepository>, issuer: TokenIssuer) -> Self {
        Self { tenants, issuer }
    }

    pub async fn register(&self, req: CreateTenantRequest) -> Result<AuthResponse, ApiError> {
        validation::validate_create_account(&req)?;

        let tenant = Tenant {
            id: Uuid::new_v4().to_string(),
            email: req.email,
            password: password_auth::generate_hash(&req.password),
            name: req.name,
            created_at: Utc::now(),
            updated_at: None,
        };

        let created = self.tenants.create_tenant(tenant).await.map_err(|err| match err {
            StoreError::Duplicate(_) => ApiError::bad_request("Email is already registered"),
            other => ApiError::from(other),
        })?;
        tracing::info!(tenant_id = %created.id, "Registered tenant");

        self.respond_with_token(&created)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        let tenant = self
            .tenants
            .find_by_email(&req.email)
            .await?
            .ok_or_else(|| ApiError::unauthorized(BAD_CREDENTIALS))?;

        password_auth::verify_password(&req.password, &tenant.password)
            .map_err(|_| ApiError::unauthorized(BAD_CREDENTIALS))?;

        self.respond_with_token(&tenant)
    }

    fn respond_with_token(&self, tenant: &Tenant) -> Result<AuthResponse, ApiError> {
        let token = self.issuer.issue(&tenant.id).map_err(|e| {
            tracing::error!("Failed to issue token: {}", e);
            ApiError::internal_server_error("Failed to sign in")
        })?;

        Ok(AuthResponse {
            tenant: TenantView::from(tenant),
            token,
        })
    }
}
