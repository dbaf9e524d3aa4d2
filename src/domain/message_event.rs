//! Events published to a channel.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ChannelId;

/// One unit of data published to a channel.
///
/// Ephemeral: it lives only for the duration of a fan-out and is never
/// stored. `origin` identifies the producer so that receiving clients can
/// recognise their own echoed messages; the relay itself never filters on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageEvent {
    /// Target channel.
    pub channel: ChannelId,
    /// Event name, e.g. `"message-in"`.
    pub event: String,
    /// Opaque structured payload.
    pub payload: serde_json::Value,
    /// Sender identifier, if the producer supplied one.
    pub origin: Option<String>,
    /// When the relay accepted the event.
    pub timestamp: DateTime<Utc>,
}

impl MessageEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        channel: ChannelId,
        event: impl Into<String>,
        payload: serde_json::Value,
        origin: Option<String>,
    ) -> Self {
        Self {
            channel,
            event: event.into(),
            payload,
            origin,
            timestamp: Utc::now(),
        }
    }
}
