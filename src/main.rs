use anyhow::Context;
use tracing_subscriber::EnvFilter;

use queue_dashboard::api::{self, AppState};
use queue_dashboard::config::AppConfig;
use queue_dashboard::grpc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    config.validate()?;
    tracing::info!("Starting queue dashboard in {:?} mode", config.environment);

    let port = config.server.port;
    let grpc_port = config.server.grpc_port;
    let state = AppState::from_config(config).await?;
    let project_store = state.project_store.clone();
    let app = api::app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    let grpc_addr = format!("0.0.0.0:{}", grpc_port);
    let grpc_listener = tokio::net::TcpListener::bind(&grpc_addr)
        .await
        .with_context(|| format!("failed to bind {}", grpc_addr))?;

    tracing::info!("Queue dashboard listening on http://{}{}", bind_addr, api::PREFIX);
    tracing::info!("Project config gRPC service listening on {}", grpc_addr);

    // Either server stopping takes the process down
    tokio::try_join!(
        async { axum::serve(listener, app).await.context("http server") },
        async { grpc::serve(project_store, grpc_listener).await.context("grpc server") },
    )?;
    Ok(())
}
