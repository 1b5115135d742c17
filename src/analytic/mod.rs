//! Realtime queue analytics: the upstream gRPC feed and its SSE relay.

pub mod grpc;
pub mod relay;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

pub use grpc::GrpcAnalyticClient;
pub use relay::{AnalyticRelay, RelayOutcome, RelaySession};

#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("failed to open analytic stream: {0}")]
    Open(String),

    #[error("failed to receive analytic sample: {0}")]
    Receive(String),

    #[error("analytic stream ended before a sample arrived")]
    Closed,
}

/// One telemetry sample as produced by the analytics service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticSample {
    pub timestamp: DateTime<Utc>,
    pub total_users_in_queue: i64,
    pub total_users_in_room: i64,
    pub total_users: i64,
}

/// Public shape of a sample, tagged with the project it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticEvent {
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub total_users_in_queue: i64,
    pub total_users_in_room: i64,
    pub total_users: i64,
}

impl AnalyticEvent {
    pub fn from_sample(project_id: &str, sample: AnalyticSample) -> Self {
        Self {
            project_id: project_id.to_string(),
            timestamp: sample.timestamp,
            total_users_in_queue: sample.total_users_in_queue,
            total_users_in_room: sample.total_users_in_room,
            total_users: sample.total_users,
        }
    }
}

pub type SampleStream = BoxStream<'static, Result<AnalyticSample, UpstreamError>>;

/// Opens one logical sample stream per project. Dropping the stream closes it.
#[async_trait]
pub trait AnalyticSource: Send + Sync {
    async fn open_stream(&self, project_id: &str) -> Result<SampleStream, UpstreamError>;
}
