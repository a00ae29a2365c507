//! Publish Route
//!
//! - POST /api/v1/publish - Deliver an event to subscribed connections

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{PublishRequest, PublishResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// POST /api/v1/publish
pub async fn publish(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PublishRequest>,
) -> ApiResult<Json<PublishResponse>> {
    let topic = req.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::Validation("topic must not be empty".to_string()));
    }

    let hub = state.hub.hub();
    let delivered = match req.identity.as_deref() {
        Some("") => {
            return Err(ApiError::Validation(
                "identity must not be empty when given".to_string(),
            ))
        }
        Some(identity) => hub.publish_private(identity, topic, &req.payload).await,
        None => hub.publish(topic, &req.payload).await,
    };

    tracing::debug!(topic = %topic, delivered, "Published via API");
    Ok(Json(PublishResponse { delivered }))
}
