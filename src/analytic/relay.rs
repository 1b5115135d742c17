use std::sync::Arc;

use axum::http::{
    header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
    HeaderMap, HeaderValue,
};
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::{AnalyticEvent, AnalyticSource, SampleStream, UpstreamError};
use crate::error::ApiError;
use crate::middleware::{Guard, GuardError};

const STREAM_DONE: &str = "Stream done";

/// How a relayed stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream finished on its own
    Completed,
    /// Client disconnected first
    ClientGone,
    /// Open, receive or write failure, reported with an error envelope
    Failed,
}

/// One open upstream stream for one project. Dropping it closes the stream.
pub struct RelaySession {
    project_id: String,
    upstream: SampleStream,
}

impl RelaySession {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Next sample mapped to its public shape, `None` once upstream completes
    pub async fn next_event(&mut self) -> Result<Option<AnalyticEvent>, UpstreamError> {
        match self.upstream.next().await {
            Some(Ok(sample)) => Ok(Some(AnalyticEvent::from_sample(&self.project_id, sample))),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }
}

/// Bridges the analytics source into SSE responses and one-shot reads
#[derive(Clone)]
pub struct AnalyticRelay {
    source: Arc<dyn AnalyticSource>,
}

impl AnalyticRelay {
    pub fn new(source: Arc<dyn AnalyticSource>) -> Self {
        Self { source }
    }

    pub async fn open(&self, project_id: &str) -> Result<RelaySession, UpstreamError> {
        let upstream = self.source.open_stream(project_id).await?;
        Ok(RelaySession {
            project_id: project_id.to_string(),
            upstream,
        })
    }

    /// Read exactly one event, then close the session
    pub async fn snapshot(&self, project_id: &str) -> Result<AnalyticEvent, UpstreamError> {
        let mut session = self.open(project_id).await?;
        session.next_event().await?.ok_or(UpstreamError::Closed)
    }

    /// Relay every upstream sample to the client as an SSE frame.
    ///
    /// Each step races client disconnect against the next sample, preferring
    /// disconnect. The session is dropped on every exit path.
    pub async fn relay<I>(&self, g: &mut Guard<I>, project_id: &str) -> Result<RelayOutcome, GuardError> {
        set_event_stream_headers(g.writer().headers_mut());

        let mut session = match self.open(project_id).await {
            Ok(session) => session,
            Err(err) => return fail(g, project_id, &ApiError::from(err)).await,
        };
        debug!(project_id, "analytic stream opened");

        loop {
            let next = tokio::select! {
                biased;
                _ = g.cancelled() => None,
                next = session.next_event() => Some(next),
            };

            let event = match next {
                None => return client_gone(g, project_id).await,
                Some(Ok(Some(event))) => event,
                Some(Ok(None)) => {
                    info!(project_id, events = g.events_sent(), "analytic stream completed");
                    return match g.return_success(&STREAM_DONE).await {
                        Ok(()) => Ok(RelayOutcome::Completed),
                        Err(GuardError::ClientGone) => Ok(RelayOutcome::ClientGone),
                        Err(err) => Err(err),
                    };
                }
                Some(Err(err)) => return fail(g, project_id, &ApiError::from(err)).await,
            };

            match g.return_event(&event).await {
                Ok(()) => {}
                Err(GuardError::ClientGone) => return client_gone(g, project_id).await,
                Err(GuardError::StreamingUnsupported) => {
                    warn!(project_id, "transport cannot stream events");
                    return fail(g, project_id, &ApiError::from(GuardError::StreamingUnsupported)).await;
                }
                Err(err) => {
                    error!(project_id, "failed to send analytic event: {}", err);
                    let err = ApiError::internal_server_error("Error sent data from stream");
                    return fail(g, project_id, &err).await;
                }
            }
        }
    }
}

/// Close with an error envelope. A client that already left is a normal close.
async fn fail<I>(g: &mut Guard<I>, project_id: &str, err: &ApiError) -> Result<RelayOutcome, GuardError> {
    match g.return_api_error(err).await {
        Ok(()) => Ok(RelayOutcome::Failed),
        Err(GuardError::ClientGone) => {
            debug!(project_id, "client left before the error envelope was delivered");
            Ok(RelayOutcome::ClientGone)
        }
        Err(err) => Err(err),
    }
}

async fn client_gone<I>(g: &mut Guard<I>, project_id: &str) -> Result<RelayOutcome, GuardError> {
    debug!(project_id, events = g.events_sent(), "client disconnected from analytic stream");

    // The body receiver is gone, so the closing envelope usually has nowhere to go
    match g.return_success(&STREAM_DONE).await {
        Ok(()) | Err(GuardError::ClientGone) => Ok(RelayOutcome::ClientGone),
        Err(err) => Err(err),
    }
}

fn set_event_stream_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
}
