// api/mod.rs - Application state and the `/bc/dashboard` router
use std::sync::Arc;

use axum::{routing::any, routing::MethodRouter, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::analytic::{AnalyticRelay, AnalyticSource, GrpcAnalyticClient};
use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::database::{MemoryStore, PgStore, ProjectRepository, TenantRepository};
use crate::handlers::{protected, public, ProtectedHandler, PublicHandler};
use crate::middleware::Gate;
use crate::services::{AuthService, ConfigurationService, HttpInfraManager, InfraManager, ProjectService};

pub const PREFIX: &str = "/bc/dashboard";

/// Everything a handler can reach. Cheap to clone; shared parts sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gate: Gate,
    pub auth: Arc<AuthService>,
    pub projects: Arc<ProjectService>,
    pub configurations: Arc<ConfigurationService>,
    pub relay: AnalyticRelay,
    /// Store behind the project routes, also served over gRPC
    pub project_store: Arc<dyn ProjectRepository>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        tenants: Arc<dyn TenantRepository>,
        projects: Arc<dyn ProjectRepository>,
        infra: Arc<dyn InfraManager>,
        analytics: Arc<dyn AnalyticSource>,
    ) -> Self {
        let issuer = TokenIssuer::new(
            &config.security.jwt_secret,
            config.security.jwt_issuer.clone(),
            config.security.jwt_expiry_hours,
        );

        Self {
            gate: Gate::from_config(&config),
            auth: Arc::new(AuthService::new(tenants, issuer)),
            projects: Arc::new(ProjectService::new(projects.clone(), infra.clone())),
            configurations: Arc::new(ConfigurationService::new(projects.clone(), infra)),
            project_store: projects,
            relay: AnalyticRelay::new(analytics),
            config: Arc::new(config),
        }
    }

    /// Wire the production collaborators named by `config`
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let (tenants, projects): (Arc<dyn TenantRepository>, Arc<dyn ProjectRepository>) =
            match config.database.url.as_deref() {
                Some(url) => {
                    let store = Arc::new(PgStore::connect(url, &config.database).await?);
                    store.migrate().await?;
                    tracing::info!("Using postgres store");
                    (store.clone() as Arc<dyn TenantRepository>, store as Arc<dyn ProjectRepository>)
                }
                None => {
                    tracing::info!("DATABASE_URL not set, using in-memory store");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone() as Arc<dyn TenantRepository>, store as Arc<dyn ProjectRepository>)
                }
            };

        let infra = Arc::new(HttpInfraManager::new(config.infra.manager_url.clone()));
        let analytics = Arc::new(GrpcAnalyticClient::connect_lazy(&config.upstream)?);
        tracing::info!(addr = %config.upstream.analytic_addr, "Analytic upstream configured");

        Ok(Self::new(config, tenants, projects, infra, analytics))
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Liveness
        .route(&path("/"), any(root))
        .route(PREFIX, any(root))
        .route(&path("/ping"), any(ping))
        // Default gate
        .route(&path("/auth/register"), open(&state, public::auth::register))
        .route(&path("/auth/login"), open(&state, public::auth::login))
        .route(&path("/project/clear"), open(&state, public::project::clear))
        .route(&path("/analytic"), open(&state, public::analytic::stream))
        // Auth gate
        .route(&path("/project"), guarded(&state, protected::project::create))
        .route(&path("/project/list"), guarded(&state, protected::project::list))
        .route(&path("/project/detail/:id"), guarded(&state, protected::project::detail))
        .route(&path("/project/health/:id"), guarded(&state, protected::project::health))
        .route(&path("/project/config"), guarded(&state, protected::project::update_config))
        .route(&path("/analytic/:id"), guarded(&state, protected::analytic::snapshot))
        // Global middleware; gzip skips event streams
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn path(route: &str) -> String {
    format!("{}{}", PREFIX, route)
}

fn open(state: &AppState, handler: PublicHandler) -> MethodRouter {
    let st = state.clone();
    any(state.gate.default_gate(move |g| handler(st.clone(), g)))
}

fn guarded(state: &AppState, handler: ProtectedHandler) -> MethodRouter {
    let st = state.clone();
    any(state.gate.auth_gate(move |g| handler(st.clone(), g)))
}

async fn root() -> &'static str {
    "Queue dashboard gateway\n"
}

async fn ping() -> &'static str {
    "pong!\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytic::{AnalyticSample, SampleStream, UpstreamError};
    use crate::testing::TestContext;
    use async_trait::async_trait;
    use futures::StreamExt;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    struct SilentSource;

    #[async_trait]
    impl AnalyticSource for SilentSource {
        async fn open_stream(&self, _project_id: &str) -> Result<SampleStream, UpstreamError> {
            Ok(futures::stream::empty::<Result<AnalyticSample, UpstreamError>>().boxed())
        }
    }

    fn test_app() -> Router {
        let ctx = TestContext::new();
        let mut config = AppConfig::development();
        config.security.jwt_secret = TestContext::SECRET.to_string();
        app(AppState::new(
            config,
            ctx.store.clone(),
            ctx.store.clone(),
            ctx.infra.clone(),
            Arc::new(SilentSource),
        ))
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn ping_is_plain_text() {
        let response = test_app()
            .oneshot(Request::get("/bc/dashboard/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "pong!\n");
    }

    #[tokio::test]
    async fn wrong_method_on_gated_route_is_an_envelope() {
        let response = test_app()
            .oneshot(Request::get("/bc/dashboard/auth/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], 405);
        assert_eq!(body["message"], "Method not allowed");
    }

    #[tokio::test]
    async fn envelopes_are_gzipped_but_event_streams_are_not() {
        let request = |uri: &str| {
            Request::get(uri)
                .header(header::ACCEPT_ENCODING, "gzip")
                .body(Body::empty())
                .unwrap()
        };

        let response = test_app().oneshot(request("/bc/dashboard/auth/login")).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");

        let response = test_app()
            .oneshot(request("/bc/dashboard/analytic?project_id=concert"))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn protected_route_without_token_is_plain_401() {
        let response = test_app()
            .oneshot(Request::get("/bc/dashboard/project/list").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }
}
