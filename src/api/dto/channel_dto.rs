//! Channel query DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ChannelId;

/// Occupancy of one channel.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChannelInfo {
    /// Channel name.
    pub channel: String,
    /// `true` if at least one connection is subscribed.
    pub occupied: bool,
    /// Number of subscribed connections.
    pub subscription_count: usize,
}

impl ChannelInfo {
    /// Builds the DTO from a channel and its member count.
    #[must_use]
    pub fn new(channel: &ChannelId, subscription_count: usize) -> Self {
        Self {
            channel: channel.to_string(),
            occupied: subscription_count > 0,
            subscription_count,
        }
    }
}

/// Response body for `GET /api/v1/channels`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChannelListResponse {
    /// Occupied channels, sorted by name.
    pub channels: Vec<ChannelInfo>,
    /// Live connections across all channels.
    pub connections: usize,
}
