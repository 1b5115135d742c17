use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tonic::{
    codec::ProstCodec,
    codegen::http::uri::PathAndQuery,
    transport::{Channel, Endpoint},
};

use super::{AnalyticSample, AnalyticSource, SampleStream, UpstreamError};
use crate::config::UpstreamConfig;

const STREAM_REALTIME_DATA: &str = "/bc.AnalyticService/StreamRealtimeData";

/// `bc.AnalyticRequest`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalyticRequest {
    #[prost(string, tag = "1")]
    pub project_id: String,
}

/// `bc.AnalyticResponse`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalyticResponse {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<prost_types::Timestamp>,
    #[prost(int64, tag = "2")]
    pub total_users_in_queue: i64,
    #[prost(int64, tag = "3")]
    pub total_users_in_room: i64,
    #[prost(int64, tag = "4")]
    pub total_users: i64,
}

impl From<AnalyticResponse> for AnalyticSample {
    fn from(message: AnalyticResponse) -> Self {
        // Missing or out-of-range timestamps fall back to the epoch
        let timestamp = message
            .timestamp
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.seconds, u32::try_from(ts.nanos).unwrap_or(0)))
            .unwrap_or_default();

        Self {
            timestamp,
            total_users_in_queue: message.total_users_in_queue,
            total_users_in_room: message.total_users_in_room,
            total_users: message.total_users,
        }
    }
}

/// Analytics service client over a shared tonic channel.
///
/// The channel connects lazily and is cloned per call; each call opens its own
/// HTTP/2 stream.
#[derive(Clone)]
pub struct GrpcAnalyticClient {
    channel: Channel,
}

impl GrpcAnalyticClient {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    pub fn connect_lazy(config: &UpstreamConfig) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(config.analytic_addr.clone())?
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_lazy();
        Ok(Self::new(channel))
    }
}

#[async_trait]
impl AnalyticSource for GrpcAnalyticClient {
    async fn open_stream(&self, project_id: &str) -> Result<SampleStream, UpstreamError> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| UpstreamError::Open(format!("service was not ready: {}", e)))?;

        let request = tonic::Request::new(AnalyticRequest {
            project_id: project_id.to_string(),
        });
        let response = grpc
            .server_streaming(
                request,
                PathAndQuery::from_static(STREAM_REALTIME_DATA),
                ProstCodec::<AnalyticRequest, AnalyticResponse>::default(),
            )
            .await
            .map_err(|status| UpstreamError::Open(status.to_string()))?;

        let samples = response.into_inner().map(|item| {
            item.map(AnalyticSample::from)
                .map_err(|status| UpstreamError::Receive(status.to_string()))
        });

        Ok(samples.boxed())
    }
}
