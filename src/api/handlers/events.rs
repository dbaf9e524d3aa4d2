//! Generic publish endpoint for trusted producers.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use super::json_body;
use crate::api::dto::{PublishEventRequest, PublishEventResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};

/// `POST /events` — Publish an event to a channel.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] for malformed input.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Publish an event",
    description = "Fans the event out to every connection currently subscribed to the channel. Publishing to a channel without members succeeds with zero attempts.",
    request_body = PublishEventRequest,
    responses(
        (status = 200, description = "Event published", body = PublishEventResponse),
        (status = 400, description = "Invalid channel, event, or payload", body = ErrorResponse),
    )
)]
pub async fn publish_event(
    State(state): State<AppState>,
    body: Result<Json<PublishEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, RelayError> {
    let req = json_body(body)?;
    let channel = req.channel.clone();
    let event = req.event.clone();

    let delivery = state.gateway.publish(req.into()).await?;

    Ok(Json(PublishEventResponse {
        channel,
        event,
        delivery,
    }))
}

/// Event routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events", post(publish_event))
}
