//! `bc.ProjectConfigService`: queue gateways read a project's queue settings over gRPC.
//!
//! Messages and the server glue are written out by hand in the shape
//! `tonic-build` generates, so the crate needs no protoc at build time.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::NaiveDateTime;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codec::ProstCodec;
use tonic::codegen::{empty_body, http, Body, BoxFuture, Service, StdError};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::{Request, Response, Status};

use crate::database::{Configuration, ProjectRepository};

pub const GET_PROJECT_CONFIG: &str = "/bc.ProjectConfigService/GetProjectConfig";

/// `bc.ConfigRequest`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigRequest {
    #[prost(string, tag = "1")]
    pub project_id: String,
}

/// `bc.ProjectConfigResponse`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProjectConfigResponse {
    #[prost(string, tag = "1")]
    pub project_id: String,
    #[prost(int32, tag = "2")]
    pub threshold: i32,
    #[prost(int32, tag = "3")]
    pub session_time: i32,
    #[prost(string, tag = "4")]
    pub host: String,
    #[prost(string, tag = "5")]
    pub base_url: String,
    #[prost(int32, tag = "6")]
    pub max_users_in_queue: i32,
    #[prost(message, optional, tag = "7")]
    pub queue_start: Option<prost_types::Timestamp>,
    #[prost(message, optional, tag = "8")]
    pub queue_end: Option<prost_types::Timestamp>,
    #[prost(string, tag = "9")]
    pub queue_page_style: String,
    #[prost(string, tag = "10")]
    pub queue_html_page: String,
    #[prost(string, tag = "11")]
    pub queue_page_title: String,
    #[prost(string, tag = "12")]
    pub queue_page_logo: String,
    #[prost(bool, tag = "13")]
    pub is_configure: bool,
}

/// Queue times are stored without a zone and read as UTC
fn timestamp(at: NaiveDateTime) -> prost_types::Timestamp {
    let at = at.and_utc();
    prost_types::Timestamp {
        seconds: at.timestamp(),
        nanos: i32::try_from(at.timestamp_subsec_nanos()).unwrap_or(0),
    }
}

impl From<Configuration> for ProjectConfigResponse {
    fn from(config: Configuration) -> Self {
        Self {
            project_id: config.project_id,
            threshold: config.threshold,
            session_time: config.session_time,
            host: config.host.unwrap_or_default(),
            base_url: config.base_url.unwrap_or_default(),
            max_users_in_queue: config.max_users_in_queue,
            queue_start: config.queue_start.map(timestamp),
            queue_end: config.queue_end.map(timestamp),
            queue_page_style: config.queue_page_style,
            queue_html_page: config.queue_html_page.unwrap_or_default(),
            queue_page_title: config.queue_page_title.unwrap_or_default(),
            queue_page_logo: config.queue_page_logo.unwrap_or_default(),
            is_configure: config.is_configure,
        }
    }
}

/// Look up one project's settings, mapping store outcomes to gRPC statuses
pub async fn project_config(
    projects: &dyn ProjectRepository,
    project_id: &str,
) -> Result<ProjectConfigResponse, Status> {
    if project_id.is_empty() {
        return Err(Status::invalid_argument("project_id is required"));
    }

    match projects.find_config(project_id).await {
        Ok(Some(config)) => Ok(config.into()),
        Ok(None) => Err(Status::not_found("Project not found")),
        Err(err) => {
            tracing::error!(project_id, "Failed to load project configuration: {}", err);
            Err(Status::internal("Failed to load project configuration"))
        }
    }
}

/// Tower service answering `bc.ProjectConfigService` calls
#[derive(Clone)]
pub struct ProjectConfigServer {
    projects: Arc<dyn ProjectRepository>,
}

impl ProjectConfigServer {
    pub fn new(projects: Arc<dyn ProjectRepository>) -> Self {
        Self { projects }
    }
}

struct GetProjectConfigSvc(Arc<dyn ProjectRepository>);

impl UnaryService<ConfigRequest> for GetProjectConfigSvc {
    type Response = ProjectConfigResponse;
    type Future = BoxFuture<Response<Self::Response>, Status>;

    fn call(&mut self, request: Request<ConfigRequest>) -> Self::Future {
        let projects = self.0.clone();
        Box::pin(async move {
            let project_id = request.into_inner().project_id;
            tracing::debug!(%project_id, "GetProjectConfig");
            project_config(projects.as_ref(), &project_id).await.map(Response::new)
        })
    }
}

impl<B> Service<http::Request<B>> for ProjectConfigServer
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        match req.uri().path() {
            GET_PROJECT_CONFIG => {
                let method = GetProjectConfigSvc(self.projects.clone());
                Box::pin(async move {
                    let mut grpc = Grpc::new(ProstCodec::default());
                    Ok(grpc.unary(method, req).await)
                })
            }
            _ => Box::pin(async move {
                let mut response = http::Response::new(empty_body());
                let headers = response.headers_mut();
                // 12 = UNIMPLEMENTED
                headers.insert("grpc-status", http::HeaderValue::from_static("12"));
                headers.insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static("application/grpc"));
                Ok(response)
            }),
        }
    }
}

impl NamedService for ProjectConfigServer {
    const NAME: &'static str = "bc.ProjectConfigService";
}

/// Serve `bc.ProjectConfigService` on an already bound listener until the process stops
pub async fn serve(projects: Arc<dyn ProjectRepository>, listener: TcpListener) -> Result<(), tonic::transport::Error> {
    tonic::transport::Server::builder()
        .add_service(ProjectConfigServer::new(projects))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await
}
