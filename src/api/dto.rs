//! Data Transfer Objects
//!
//! Request and response types for the HTTP endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Publish request: deliver `payload` to subscribers of `topic`
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    /// Topic name (e.g., "btcusd.trades")
    pub topic: String,
    /// Arbitrary JSON payload
    pub payload: Value,
    /// Target identity; when set the event goes to that identity's private subscription
    #[serde(default)]
    pub identity: Option<String>,
}

/// Publish response
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Number of connections the event was queued for
    pub delivered: usize,
}

/// Full health status response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,
    /// Live WebSocket connections
    pub connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
