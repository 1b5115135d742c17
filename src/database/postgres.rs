use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use tracing::info;

use super::{
    Configuration, ConfigurationUpdate, Project, ProjectRepository, ProjectWithConfig, StoreError, Tenant,
    TenantRepository,
};
use crate::config::DatabaseConfig;

const SCHEMA: &str = include_str!("schema.sql");

const PROJECT_WITH_CONFIG: &str = r#"
    SELECT p.id, p.name, p.tenant_id, p.created_at,
           c.project_id, c.threshold, c.session_time, c.host, c.base_url, c.max_users_in_queue,
           c.queue_start, c.queue_end, c.queue_page_style, c.queue_html_page,
           c.queue_page_base_color, c.queue_page_title, c.queue_page_logo, c.is_configure, c.updated_at
    FROM projects p
    INNER JOIN configurations c ON c.project_id = p.id
    WHERE p.id = $1 AND p.tenant_id = $2
    LIMIT 1
"#;

/// Postgres-backed repositories sharing one pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create missing tables
    pub async fn migrate(&self) -> Result<(), StoreError> {
        self.pool.execute(SCHEMA).await?;
        info!("Database schema ready");
        Ok(())
    }
}

/// Map a unique violation to `Duplicate(what)`, pass everything else through
fn unique_as_duplicate(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what.to_string()),
        _ => StoreError::Sqlx(err),
    }
}

#[async_trait]
impl TenantRepository for PgStore {
    async fn create_tenant(&self, tenant: Tenant) -> Result<Tenant, StoreError> {
        sqlx::query("INSERT INTO tenants (id, email, password, name, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(&tenant.id)
            .bind(&tenant.email)
            .bind(&tenant.password)
            .bind(&tenant.name)
            .bind(tenant.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_as_duplicate(e, "Email"))?;
        Ok(tenant)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Tenant>, StoreError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE email = $1 LIMIT 1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }
}

#[async_trait]
impl ProjectRepository for PgStore {
    async fn create_project(&self, project: Project) -> Result<Project, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO projects (id, name, tenant_id, created_at) VALUES ($1, $2, $3, $4)")
            .bind(&project.id)
            .bind(&project.name)
            .bind(&project.tenant_id)
            .bind(project.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| unique_as_duplicate(e, "Project"))?;

        sqlx::query("INSERT INTO configurations (project_id) VALUES ($1)")
            .bind(&project.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(project)
    }

    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT id, name, tenant_id, created_at FROM projects WHERE tenant_id = $1 ORDER BY id",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    async fn find_with_config(
        &self,
        project_id: &str,
        tenant_id: &str,
    ) -> Result<Option<ProjectWithConfig>, StoreError> {
        let row = sqlx::query_as::<_, ProjectWithConfig>(PROJECT_WITH_CONFIG)
            .bind(project_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_config(&self, project_id: &str) -> Result<Option<Configuration>, StoreError> {
        let row = sqlx::query_as::<_, Configuration>("SELECT * FROM configurations WHERE project_id = $1 LIMIT 1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_config(&self, update: &ConfigurationUpdate) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE configurations
            SET threshold = $1, session_time = $2, host = $3, base_url = $4,
                max_users_in_queue = $5, queue_start = $6, queue_end = $7,
                is_configure = TRUE, updated_at = $8
            WHERE project_id = $9
            "#,
        )
        .bind(update.threshold)
        .bind(update.session_time)
        .bind(&update.host)
        .bind(&update.base_url)
        .bind(update.max_users_in_queue)
        .bind(update.queue_start)
        .bind(update.queue_end)
        .bind(Utc::now())
        .bind(&update.project_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Project".to_string()));
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("TRUNCATE TABLE configurations").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM projects").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}
