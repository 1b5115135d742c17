use std::collections::HashMap;

use axum::{
    body::Body,
    http::{
        header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
        request::Parts,
        HeaderMap, HeaderValue, Method, StatusCode, Uri,
    },
};
use serde::{de::DeserializeOwned, Serialize};
use sync_wrapper::SyncWrapper;
use thiserror::Error;

use super::response::{self, Envelope};
use super::writer::ResponseWriter;
use crate::auth::Claims;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("streaming unsupported")]
    StreamingUnsupported,

    #[error("a terminal response was already written")]
    AlreadyResponded,

    #[error("status already committed as {0}")]
    StatusCommitted(StatusCode),

    #[error("client connection closed")]
    ClientGone,

    #[error("malformed request body: {0}")]
    BadRequest(String),
}

/// Identity of a request that went through the default gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Anonymous;

/// Guard whose identity was verified by the auth gate
pub type AuthGuard = Guard<Claims>;

/// Per-request context handed to every handler.
///
/// Owns the request parts, the unread body and the response writer. The
/// envelope methods are implemented once for every identity type.
pub struct Guard<I = Anonymous> {
    parts: Parts,
    body: Option<SyncWrapper<Body>>,
    params: HashMap<String, String>,
    body_limit: usize,
    writer: ResponseWriter,
    identity: I,
    responded: bool,
    events: usize,
}

impl<I> Guard<I> {
    pub(crate) fn new(
        parts: Parts,
        body: Body,
        params: HashMap<String, String>,
        body_limit: usize,
        writer: ResponseWriter,
        identity: I,
    ) -> Self {
        Self {
            parts,
            body: Some(SyncWrapper::new(body)),
            params,
            body_limit,
            writer,
            identity,
            responded: false,
            events: 0,
        }
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn is_method(&self, method: Method) -> bool {
        self.parts.method == method
    }

    /// Matched path parameter, e.g. `id` for `/project/detail/:id`
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// First value of a query string parameter
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.parts.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    }

    /// Read and decode the JSON request body. The body can be consumed once.
    pub async fn body_parser<T: DeserializeOwned>(&mut self) -> Result<T, GuardError> {
        let body = self
            .body
            .take()
            .map(SyncWrapper::into_inner)
            .ok_or_else(|| GuardError::BadRequest("request body already consumed".to_string()))?;

        let bytes = axum::body::to_bytes(body, self.body_limit)
            .await
            .map_err(|e| GuardError::BadRequest(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| GuardError::BadRequest(e.to_string()))
    }

    /// Direct access to the response writer, for headers set before the first write
    pub fn writer(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    pub fn has_responded(&self) -> bool {
        self.responded
    }

    pub fn events_sent(&self) -> usize {
        self.events
    }

    /// Resolves when the client disconnects
    pub async fn cancelled(&self) {
        self.writer.closed().await
    }

    pub async fn return_error(&mut self, status: StatusCode, message: &str) -> Result<(), GuardError> {
        let body = response::encode(&Envelope::<()>::error(status, message))?;
        self.respond(status, body).await
    }

    /// Write an `ApiError` as its error envelope
    pub async fn return_api_error(&mut self, err: &ApiError) -> Result<(), GuardError> {
        self.return_error(err.status_code(), err.message()).await
    }

    pub async fn return_success<T: Serialize>(&mut self, data: &T) -> Result<(), GuardError> {
        let body = response::encode(&Envelope::success(data))?;
        self.respond(StatusCode::OK, body).await
    }

    /// Envelope status is 201; the status line stays 200
    pub async fn return_created<T: Serialize>(&mut self, data: &T) -> Result<(), GuardError> {
        let body = response::encode(&Envelope::created(data))?;
        self.respond(StatusCode::OK, body).await
    }

    /// Write one SSE frame and push it to the client immediately
    pub async fn return_event<T: Serialize>(&mut self, data: &T) -> Result<(), GuardError> {
        if self.responded {
            return Err(GuardError::AlreadyResponded);
        }
        if !self.writer.supports_flush() {
            return Err(GuardError::StreamingUnsupported);
        }

        let frame = response::event_frame(data)?;
        self.writer.write(&frame);
        self.events += 1;
        self.writer.flush().await
    }

    async fn respond(&mut self, status: StatusCode, body: Vec<u8>) -> Result<(), GuardError> {
        if self.responded {
            return Err(GuardError::AlreadyResponded);
        }

        if !self.writer.is_committed() {
            self.writer
                .headers_mut()
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static("application/json"));
        }

        match self.writer.write_header(status) {
            Ok(()) => {}
            Err(GuardError::StatusCommitted(committed)) if self.events > 0 => {
                tracing::warn!(
                    %committed,
                    requested = %status,
                    events = self.events,
                    "status already sent by the event stream, appending closing envelope"
                );
            }
            Err(err) => return Err(err),
        }

        self.responded = true;
        self.writer.write(&body);
        self.writer.send_pending().await
    }

    /// Plain-text 500 for handlers that returned an error instead of responding
    pub(crate) async fn fallback_error(&mut self, message: &str) {
        if !self.writer.is_committed() {
            let headers = self.writer.headers_mut();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
            headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        }

        if let Err(GuardError::StatusCommitted(committed)) =
            self.writer.write_header(StatusCode::INTERNAL_SERVER_ERROR)
        {
            tracing::error!(%committed, "handler failed after the response status was sent");
        }

        self.responded = true;
        self.writer.write(format!("{}\n", message).as_bytes());
        if let Err(err) = self.writer.send_pending().await {
            tracing::debug!("fallback error not delivered: {}", err);
        }
    }
}

impl Guard<Claims> {
    /// Claims of the verified bearer token
    pub fn claims(&self) -> &Claims {
        &self.identity
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }
}
