use axum::http::StatusCode;
use serde::Serialize;

/// Uniform JSON body written by every non-streaming route.
///
/// `status` carries the semantic code, which for `created` differs from the
/// transport status line (always 200 for successes).
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub status: u16,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    pub fn success(data: &'a T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: "OK",
            data: Some(data),
            error: None,
        }
    }

    pub fn created(data: &'a T) -> Self {
        Self {
            status: StatusCode::CREATED.as_u16(),
            message: "Created",
            data: Some(data),
            error: None,
        }
    }
}

impl<'a> Envelope<'a, ()> {
    pub fn error(status: StatusCode, message: &'a str) -> Self {
        Self {
            status: status.as_u16(),
            message,
            data: None,
            error: Some(message),
        }
    }
}

/// Serialize an envelope the way it goes on the wire: one JSON document and a newline
pub fn encode<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<Vec<u8>, serde_json::Error> {
    let mut body = serde_json::to_vec(envelope)?;
    body.push(b'\n');
    Ok(body)
}

/// Format one server-sent event frame carrying `data` as JSON
pub fn event_frame<T: Serialize>(data: &T) -> Result<Vec<u8>, serde_json::Error> {
    let json = serde_json::to_vec(data)?;
    let mut frame = Vec::with_capacity(json.len() + 8);
    frame.extend_from_slice(b"data: ");
    frame.extend_from_slice(&json);
    frame.extend_from_slice(b"\n\n");
    Ok(frame)
}
