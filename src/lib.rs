//! # wsgate
//!
//! WebSocket publish/subscribe gateway. Each connection becomes a small
//! actor with its own subscription set, a bounded outbound queue and two
//! pumps: one reading requests from the socket, one writing queued events
//! and keepalive pings.
//!
//! ## Modules
//!
//! - [`websocket`]: Connection actor, pumps, hub and message formats
//! - [`api`]: HTTP router (upgrade, publish, health) with Axum
//! - [`config`]: TOML/environment configuration
//! - [`logging`]: tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsgate::{serve, AppState, Config, Hub};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let (hub, _hub_task) = Hub::spawn(config.hub_config());
//!
//!     let api_config = config.api_config();
//!     let state = AppState::new(hub, config.ws_settings(), api_config.clone());
//!     serve(state, &api_config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod logging;
pub mod websocket;

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use websocket::{
    parse_request, parse_streams_from_uri, websocket_handler, Client, ClientId, Hub, HubConfig,
    HubError, HubHandle, ParseError, PumpConfig, PumpError, Request, RequestEvent, Response,
    Subscriptions, WsSettings,
};

pub use config::{
    generate_default_config, Config, ConfigError, ConfigSource, LoadedConfig, LoggingConfig,
};
