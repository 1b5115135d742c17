#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use reqwest::StatusCode;
use serde_json::{json, Value};

use queue_dashboard::analytic::{AnalyticSample, AnalyticSource, SampleStream, UpstreamError};
use queue_dashboard::api::{self, AppState};
use queue_dashboard::config::AppConfig;
use queue_dashboard::database::{MemoryStore, ProjectRepository};
use queue_dashboard::grpc;
use queue_dashboard::services::HttpInfraManager;

pub const SECRET: &str = "integration-secret";

/// Analytic upstream that replays a fixed list of samples
#[derive(Clone, Default)]
pub struct ScriptedAnalytics {
    samples: Vec<AnalyticSample>,
    hold_open: bool,
}

impl ScriptedAnalytics {
    pub fn new(count: i64) -> Self {
        let samples = (1..=count)
            .map(|n| AnalyticSample {
                timestamp: Utc.timestamp_opt(1_717_228_800 + n, 0).unwrap(),
                total_users_in_queue: n * 10,
                total_users_in_room: n,
                total_users: n * 11,
            })
            .collect();
        Self {
            samples,
            hold_open: false,
        }
    }

    /// Keep the stream open after the last sample, like a live feed
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait]
impl AnalyticSource for ScriptedAnalytics {
    async fn open_stream(&self, project_id: &str) -> Result<SampleStream, UpstreamError> {
        if project_id.is_empty() {
            return Err(UpstreamError::Open("project id is required".to_string()));
        }
        let replay = futures::stream::iter(self.samples.clone().into_iter().map(Ok));
        if self.hold_open {
            Ok(replay.chain(futures::stream::pending()).boxed())
        } else {
            Ok(replay.boxed())
        }
    }
}

/// Stand-in for the cluster manager's HTTP API
#[derive(Clone, Default)]
pub struct FakeInfra {
    pub registered: Arc<Mutex<Vec<Value>>>,
    pub restarts: Arc<Mutex<usize>>,
}

impl FakeInfra {
    fn router(&self) -> Router {
        Router::new()
            .route("/kube/health/:id", get(infra_health))
            .route("/kube/project", post(infra_register))
            .route("/kube/restart/project", delete(infra_restart))
            .with_state(self.clone())
    }
}

async fn infra_health(Path(id): Path<String>) -> Json<Value> {
    if id == "unknown" {
        return Json(json!({ "status": "failed", "message": "project not found" }));
    }
    Json(json!({ "status": "success", "data": { "healthiness": true } }))
}

async fn infra_register(State(infra): State<FakeInfra>, Json(body): Json<Value>) -> Json<Value> {
    infra.registered.lock().unwrap().push(body);
    Json(json!({ "status": "success" }))
}

async fn infra_restart(State(infra): State<FakeInfra>) -> Json<Value> {
    *infra.restarts.lock().unwrap() += 1;
    Json(json!({ "status": "success" }))
}

/// Dashboard served in-process on a free port, with its own store and fake neighbours
pub struct TestServer {
    pub base_url: String,
    /// `http://host:port` of the project config gRPC service sharing the same store
    pub grpc_url: String,
    pub infra: FakeInfra,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(ScriptedAnalytics::new(3)).await
    }

    pub async fn start_with(analytics: ScriptedAnalytics) -> Result<Self> {
        let infra = FakeInfra::default();
        let infra_url = serve(infra.router()).await?;

        let mut config = AppConfig::development();
        config.security.jwt_secret = SECRET.to_string();
        config.infra.manager_url = infra_url.clone();

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            config,
            store.clone(),
            store,
            Arc::new(HttpInfraManager::new(infra_url)),
            Arc::new(analytics),
        );
        let grpc_url = serve_grpc(state.project_store.clone()).await?;
        let base_url = format!("{}{}", serve(api::app(state)).await?, api::PREFIX);

        let server = Self {
            base_url,
            grpc_url,
            infra,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/ping")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a tenant and return its bearer token
    pub async fn register(&self, email: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({
                "email": email,
                "name": "Owner",
                "password": "queue-pass",
                "retype_password": "queue-pass",
            }))
            .send()
            .await?;
        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("no token in register response: {}", body))
    }

    /// Register a tenant and create one project for it
    pub async fn tenant_with_project(&self, email: &str, project_id: &str) -> Result<String> {
        let token = self.register(email).await?;
        let res = self
            .client
            .post(self.url("/project"))
            .bearer_auth(&token)
            .json(&json!({ "id": project_id, "name": "Concert" }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "create project answered {}", res.status());
        Ok(token)
    }
}

async fn serve(app: Router) -> Result<String> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(format!("http://127.0.0.1:{}", port))
}

/// Serve the project config gRPC service on a free port and return its base URL
pub async fn serve_grpc(projects: Arc<dyn ProjectRepository>) -> Result<String> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;
    tokio::spawn(grpc::serve(projects, listener));
    Ok(format!("http://127.0.0.1:{}", port))
}
