use std::convert::Infallible;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use super::GuardError;
use crate::config::StreamingConfig;

/// Capabilities of the transport a writer feeds
#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    /// Whether `flush` may push partial bodies to the client
    pub flushable: bool,
    /// Chunks in flight before writes wait for the client
    pub capacity: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            flushable: true,
            capacity: 16,
        }
    }
}

impl From<&StreamingConfig> for TransportOptions {
    fn from(config: &StreamingConfig) -> Self {
        Self {
            flushable: config.enabled,
            capacity: config.channel_capacity,
        }
    }
}

#[derive(Debug)]
struct ResponseHead {
    status: StatusCode,
    headers: HeaderMap,
}

/// Response sink owned by one guard.
///
/// The status line and headers go out exactly once, on `write_header` or on the
/// first body write. Body bytes accumulate until flushed and then travel as one
/// chunk over a bounded channel, so a slow client stalls the writer.
pub struct ResponseWriter {
    headers: HeaderMap,
    status: Option<StatusCode>,
    head: Option<oneshot::Sender<ResponseHead>>,
    body: mpsc::Sender<Bytes>,
    pending: Vec<u8>,
    flushable: bool,
}

impl ResponseWriter {
    /// Create a writer and the response half the HTTP layer hands back to the client
    pub fn channel(options: TransportOptions) -> (Self, PendingResponse) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(options.capacity.max(1));

        let writer = Self {
            headers: HeaderMap::new(),
            status: None,
            head: Some(head_tx),
            body: body_tx,
            pending: Vec::new(),
            flushable: options.flushable,
        };

        (writer, PendingResponse { head: head_rx, body: body_rx })
    }

    /// Headers sent with the status line. Changes after commit are not transmitted.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    pub fn supports_flush(&self) -> bool {
        self.flushable
    }

    /// Commit the status line. A second call fails with the status already sent.
    pub fn write_header(&mut self, status: StatusCode) -> Result<(), GuardError> {
        if let Some(committed) = self.status {
            return Err(GuardError::StatusCommitted(committed));
        }

        self.status = Some(status);
        if let Some(head) = self.head.take() {
            // Receiver is gone when the client left before anything was sent
            let _ = head.send(ResponseHead {
                status,
                headers: self.headers.clone(),
            });
        }
        Ok(())
    }

    /// Buffer body bytes, committing 200 if nothing was committed yet
    pub fn write(&mut self, data: &[u8]) {
        if !self.is_committed() {
            let _ = self.write_header(StatusCode::OK);
        }
        self.pending.extend_from_slice(data);
    }

    /// Push buffered bytes to the client now
    pub async fn flush(&mut self) -> Result<(), GuardError> {
        if !self.flushable {
            return Err(GuardError::StreamingUnsupported);
        }
        self.send_pending().await
    }

    /// Deliver buffered bytes regardless of flush capability, used for final writes.
    ///
    /// Cancel safe: bytes stay buffered until a channel slot is reserved.
    pub(crate) async fn send_pending(&mut self) -> Result<(), GuardError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let permit = self.body.reserve().await.map_err(|_| GuardError::ClientGone)?;
        permit.send(Bytes::from(std::mem::take(&mut self.pending)));
        Ok(())
    }

    /// Resolves once the client side of the response has been dropped
    pub async fn closed(&self) {
        self.body.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_closed()
    }
}

impl Drop for ResponseWriter {
    fn drop(&mut self) {
        if !self.is_committed() {
            let _ = self.write_header(StatusCode::OK);
        }

        if !self.pending.is_empty() {
            let unsent = self.pending.len();
            let chunk = Bytes::from(std::mem::take(&mut self.pending));
            if self.body.try_send(chunk).is_err() {
                tracing::warn!("dropping {} unsent response bytes", unsent);
            }
        }
    }
}

/// Client half of a writer: resolves into a response once the head is committed
pub struct PendingResponse {
    head: oneshot::Receiver<ResponseHead>,
    body: mpsc::Receiver<Bytes>,
}

impl PendingResponse {
    pub async fn into_response(self) -> Response {
        let Self { head, body } = self;

        match head.await {
            Ok(ResponseHead { status, headers }) => {
                let stream = ReceiverStream::new(body).map(Ok::<_, Infallible>);
                let mut response = Body::from_stream(stream).into_response();
                *response.status_mut() = status;
                *response.headers_mut() = headers;
                response
            }
            // Writer vanished without committing, which only happens if the task was aborted
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::CONTENT_TYPE, HeaderValue};
    use std::time::Duration;

    fn buffered() -> TransportOptions {
        TransportOptions {
            flushable: false,
            capacity: 4,
        }
    }

    #[tokio::test]
    async fn status_line_commits_once() {
        let (mut writer, _pending) = ResponseWriter::channel(TransportOptions::default());

        writer.write_header(StatusCode::BAD_REQUEST).unwrap();
        let err = writer.write_header(StatusCode::OK).unwrap_err();

        assert!(matches!(err, GuardError::StatusCommitted(StatusCode::BAD_REQUEST)));
        assert_eq!(writer.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn first_write_commits_ok_with_headers() {
        let (mut writer, pending) = ResponseWriter::channel(TransportOptions::default());
        writer
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));

        writer.write(b"data: 1\n\n");
        writer.flush().await.unwrap();
        drop(writer);

        let response = pending.into_response().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"data: 1\n\n");
    }

    #[tokio::test]
    async fn buffered_transport_refuses_to_flush() {
        let (mut writer, pending) = ResponseWriter::channel(buffered());

        writer.write(b"partial");
        assert!(matches!(writer.flush().await, Err(GuardError::StreamingUnsupported)));
        drop(writer);

        // Bytes written before the failed flush still reach the client at the end
        let response = pending.into_response().await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"partial");
    }

    #[tokio::test]
    async fn dropped_client_is_observed() {
        let (mut writer, pending) = ResponseWriter::channel(TransportOptions::default());
        drop(pending);

        tokio::time::timeout(Duration::from_secs(1), writer.closed())
            .await
            .expect("closed signal should fire");
        writer.write(b"late");
        assert!(matches!(writer.flush().await, Err(GuardError::ClientGone)));
    }

    #[tokio::test]
    async fn slow_client_applies_backpressure() {
        let options = TransportOptions {
            flushable: true,
            capacity: 1,
        };
        let (mut writer, pending) = ResponseWriter::channel(options);

        writer.write(b"one");
        writer.flush().await.unwrap();

        writer.write(b"two");
        let blocked = tokio::time::timeout(Duration::from_millis(50), writer.flush()).await;
        assert!(blocked.is_err(), "second chunk must wait for the client");
        // the abandoned flush keeps its bytes for the next one
        writer.write(b"+");

        let response = pending.into_response().await;
        let mut stream = response.into_body().into_data_stream();
        assert_eq!(&stream.next().await.unwrap().unwrap()[..], b"one");
        writer.flush().await.unwrap();
        assert_eq!(&stream.next().await.unwrap().unwrap()[..], b"two+");
    }

    #[tokio::test]
    async fn untouched_writer_answers_empty_ok() {
        let (writer, pending) = ResponseWriter::channel(TransportOptions::default());
        drop(writer);

        let response = pending.into_response().await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}
