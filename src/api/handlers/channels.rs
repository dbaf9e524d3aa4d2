//! Channel occupancy queries.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ChannelInfo, ChannelListResponse};
use crate::app_state::AppState;
use crate::domain::ChannelId;
use crate::error::{ErrorResponse, RelayError};

/// `GET /channels` — List occupied channels.
#[utoipa::path(
    get,
    path = "/api/v1/channels",
    tag = "Channels",
    summary = "List occupied channels",
    description = "Returns every channel with at least one subscriber and its subscription count.",
    responses(
        (status = 200, description = "Occupied channels", body = ChannelListResponse),
    )
)]
pub async fn list_channels(State(state): State<AppState>) -> impl IntoResponse {
    let channels = state
        .gateway
        .channels()
        .iter()
        .map(|(channel, count)| ChannelInfo::new(channel, *count))
        .collect();
    Json(ChannelListResponse {
        channels,
        connections: state.gateway.connection_count(),
    })
}

/// `GET /channels/{channel}` — Occupancy of one channel.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] if the channel name is invalid.
#[utoipa::path(
    get,
    path = "/api/v1/channels/{channel}",
    tag = "Channels",
    summary = "Get channel occupancy",
    description = "Unknown channels are reported as unoccupied with a count of zero.",
    params(
        ("channel" = String, Path, description = "Channel name"),
    ),
    responses(
        (status = 200, description = "Channel occupancy", body = ChannelInfo),
        (status = 400, description = "Invalid channel name", body = ErrorResponse),
    )
)]
pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let channel = ChannelId::parse(channel)?;
    let count = state.gateway.member_count(&channel);
    Ok(Json(ChannelInfo::new(&channel, count)))
}

/// Channel routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels", get(list_channels))
        .route("/channels/{channel}", get(get_channel))
}
