//! Chat message endpoint used by the browser client.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use super::json_body;
use crate::api::dto::MessagePost;
use crate::app_state::AppState;
use crate::domain::events;
use crate::error::{ErrorResponse, RelayError};
use crate::service::PublishRequest;

/// `POST /message` — Relay a chat message to its channel as `message-in`.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] if the channel is invalid or the
/// message is empty.
#[utoipa::path(
    post,
    path = "/message",
    tag = "Chat",
    summary = "Post a chat message",
    description = "Broadcasts `{message, sender, user_id, timestamp}` to the channel as a `message-in` event with `user_id` as origin.",
    request_body = MessagePost,
    responses(
        (status = 200, description = "Message accepted", body = String),
        (status = 400, description = "Invalid message", body = ErrorResponse),
    )
)]
pub async fn post_message(
    State(state): State<AppState>,
    body: Result<Json<MessagePost>, JsonRejection>,
) -> Result<impl IntoResponse, RelayError> {
    let post = json_body(body)?;
    tracing::info!(channel = %post.channel, sender = %post.sender, "received message");

    let request = into_publish(post)?;
    let report = state.gateway.publish(request).await?;
    tracing::debug!(delivered = report.delivered, failed = report.failed, "message relayed");

    Ok("OK")
}

fn into_publish(post: MessagePost) -> Result<PublishRequest, RelayError> {
    if post.message.is_empty() {
        return Err(RelayError::InvalidRequest(
            "message must not be empty".to_string(),
        ));
    }
    let timestamp = post
        .timestamp
        .unwrap_or_else(|| Utc::now().timestamp_millis());
    let payload = serde_json::json!({
        "message": post.message,
        "sender": post.sender,
        "user_id": post.user_id,
        "timestamp": timestamp,
    });

    Ok(PublishRequest {
        channel: post.channel,
        event: events::MESSAGE_IN.to_string(),
        payload: Some(payload),
        origin: post.user_id,
    })
}

/// Chat routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/message", post(post_message))
}
