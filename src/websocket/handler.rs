//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests: reads the caller's identity and the
//! streams named in the request target, registers a new [`Client`] with the
//! hub and starts its pumps.

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        OriginalUri, State,
    },
    http::{HeaderMap, Uri},
    response::Response,
};
use futures_util::StreamExt;
use std::sync::Arc;

use super::client::{Client, DEFAULT_OUTBOUND_CAPACITY};
use super::hub::HubHandle;
use super::pump::{spawn_pumps, PumpConfig};
use super::streams::parse_streams_from_uri;
use crate::api::AppState;

/// Header carrying the authenticated identity, set by an upstream auth proxy
pub const DEFAULT_IDENTITY_HEADER: &str = "JwtUID";

/// Per-connection settings applied at upgrade time
#[derive(Debug, Clone)]
pub struct WsSettings {
    pub pump: PumpConfig,
    pub outbound_capacity: usize,
    pub identity_header: String,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            pump: PumpConfig::default(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
        }
    }
}

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    State(state): State<Arc<AppState>>,
) -> Response {
    let settings = state.ws.clone();
    let identity = identity_from_headers(&headers, &settings.identity_header);
    let streams = parse_streams_from_uri(&request_target(&uri));
    let hub = state.hub.clone();

    ws.max_message_size(settings.pump.max_message_size)
        .max_frame_size(settings.pump.max_message_size)
        .on_failed_upgrade(|e| {
            tracing::error!(error = %e, "Websocket upgrade failed");
        })
        .on_upgrade(move |socket| handle_socket(socket, hub, identity, streams, settings))
}

/// Handle an established WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    hub: HubHandle,
    identity: String,
    streams: Vec<String>,
    settings: WsSettings,
) {
    let (client, outbound) = Client::new(identity, settings.outbound_capacity);
    let client = Arc::new(client);

    hub.handle_subscribe(&client, &streams).await;

    let (sink, stream) = socket.split();
    spawn_pumps(client, outbound, hub, stream, sink, settings.pump);
}

/// Identity supplied by the auth header, empty when absent or not valid text
pub fn identity_from_headers(headers: &HeaderMap, header: &str) -> String {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Path plus query string of the upgrade request
pub fn request_target(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}
