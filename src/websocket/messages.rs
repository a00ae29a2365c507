//! WebSocket Message Types
//!
//! Defines the request format clients send over the socket and the
//! response/event payloads the gateway writes back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What a client asks the gateway to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestEvent {
    Subscribe,
    Unsubscribe,
}

impl RequestEvent {
    /// Past tense used in success responses
    pub fn done(&self) -> &'static str {
        match self {
            RequestEvent::Subscribe => "subscribed",
            RequestEvent::Unsubscribe => "unsubscribed",
        }
    }
}

/// A parsed client request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Request {
    /// Requested action
    pub event: RequestEvent,
    /// Streams the action applies to (e.g., "btcusd.trades")
    pub streams: Vec<String>,
}

/// Errors produced while parsing an inbound frame
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Could not parse request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request contains no streams")]
    NoStreams,

    #[error("Binary frame is not valid UTF-8")]
    InvalidUtf8,
}

/// Parse a normalized inbound frame into a [`Request`]
pub fn parse_request(frame: &str) -> Result<Request, ParseError> {
    let request: Request = serde_json::from_str(frame)?;
    if request.streams.is_empty() {
        return Err(ParseError::NoStreams);
    }
    Ok(request)
}

/// Responses written back to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// Request applied; `streams` is the client's full subscription snapshot
    Success {
        message: String,
        streams: Vec<String>,
    },
    /// Request rejected
    Error { message: String },
}

impl Response {
    pub fn success(event: RequestEvent, streams: Vec<String>) -> Self {
        Response::Success {
            message: event.done().to_string(),
            streams,
        }
    }

    pub fn error(err: impl std::fmt::Display) -> Self {
        Response::Error {
            message: err.to_string(),
        }
    }

    /// Serialize to the text frame payload
    pub fn encode(&self) -> String {
        match serde_json::to_string(self) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                r#"{"error":{"message":"internal error"}}"#.to_string()
            }
        }
    }
}

/// Build the payload for an event published on `topic`: `{"<topic>": payload}`
pub fn event_payload(topic: &str, payload: &Value) -> String {
    let mut body = serde_json::Map::with_capacity(1);
    body.insert(topic.to_string(), payload.clone());
    Value::Object(body).to_string()
}
