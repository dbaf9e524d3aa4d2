//! Server → client frame format.
//!
//! Every frame the relay pushes to a client is a JSON object of the shape
//! `{"event", "channel"?, "payload", "origin"?, "timestamp", "id"?}`.
//! Published events are serialized once and the same bytes are shared by
//! every recipient.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelId, MessageEvent};
use crate::error::RelayError;

/// Event names used by the relay itself.
pub mod events {
    /// Sent once after the handshake; payload carries the connection id.
    pub const CONNECTION_ESTABLISHED: &str = "connection_established";
    /// Acknowledges a subscribe command.
    pub const SUBSCRIPTION_SUCCEEDED: &str = "subscription_succeeded";
    /// Acknowledges an unsubscribe command.
    pub const UNSUBSCRIBED: &str = "unsubscribed";
    /// Advisory member count, pushed to channel members on membership change.
    pub const SUBSCRIPTION_COUNT: &str = "subscription_count";
    /// Reply to a ping command.
    pub const PONG: &str = "pong";
    /// Command rejected.
    pub const ERROR: &str = "error";
    /// Chat message relayed from the `/message` endpoint.
    pub const MESSAGE_IN: &str = "message-in";
}

/// A frame pushed from the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    /// Event name.
    pub event: String,
    /// Channel the event was published on; absent for connection-level frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelId>,
    /// Event payload.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Producer identifier for published events.
    ///
    /// Sent next to the payload rather than inside it, so the payload
    /// reaches clients exactly as published. Clients filtering their own
    /// echoes compare against this field. The `/message` chat endpoint
    /// also copies its `user_id` into the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Server timestamp.
    pub timestamp: DateTime<Utc>,
    /// Echo of the client command id this frame answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ServerFrame {
    /// Builds a connection-level frame.
    #[must_use]
    pub fn control(event: &str, payload: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            channel: None,
            payload,
            origin: None,
            timestamp: Utc::now(),
            id: None,
        }
    }

    /// Builds an `error` frame.
    #[must_use]
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self::control(
            events::ERROR,
            serde_json::json!({ "code": code, "message": message.into() }),
        )
    }

    /// Attaches a channel.
    #[must_use]
    pub fn with_channel(mut self, channel: ChannelId) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Attaches the id of the command being answered.
    #[must_use]
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// Serializes the frame into shareable JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] if the payload cannot be serialized.
    pub fn encode(&self) -> Result<Arc<str>, RelayError> {
        serde_json::to_string(self)
            .map(Arc::from)
            .map_err(|e| RelayError::Internal(format!("frame serialization failed: {e}")))
    }
}

impl From<&MessageEvent> for ServerFrame {
    fn from(event: &MessageEvent) -> Self {
        Self {
            event: event.event.clone(),
            channel: Some(event.channel.clone()),
            payload: event.payload.clone(),
            origin: event.origin.clone(),
            timestamp: event.timestamp,
            id: None,
        }
    }
}
