//! WebSocket Gateway
//!
//! Adapts each WebSocket connection into a connection actor with two pumps.
//!
//! ## Architecture
//!
//! - **Client**: Per-connection actor (identity, subscriptions, outbound queue)
//! - **Pumps**: Read pump (socket → hub) and write pump (queue + pings → socket)
//! - **Hub**: Dispatcher that applies requests and publishes events
//! - **Handler**: Handles WebSocket upgrade and starts the pumps
//! - **Messages**: Request parsing and response formatting
//!
//! ## Usage
//!
//! Clients connect to `/ws`, optionally naming streams up front:
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws?stream=btcusd.trades,ethusd.trades');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({event: 'subscribe', streams: ['ltcusd.trades']}));
//! };
//! ```

mod client;
mod handler;
mod hub;
mod messages;
mod pump;
mod streams;
mod subscriptions;

pub use client::{Client, ClientId, DEFAULT_OUTBOUND_CAPACITY};
pub use handler::{
    identity_from_headers, request_target, websocket_handler, WsSettings, DEFAULT_IDENTITY_HEADER,
};
pub use hub::{Hub, HubConfig, HubError, HubHandle, HubReceivers, HubRequest};
pub use messages::{event_payload, parse_request, ParseError, Request, RequestEvent, Response};
pub use pump::{
    normalize_frame, read_pump, spawn_pumps, write_pump, ClientTasks, PumpConfig, PumpError,
    Shutdown, MAX_MESSAGE_SIZE, PONG_WAIT, WRITE_WAIT,
};
pub use streams::parse_streams_from_uri;
pub use subscriptions::Subscriptions;
