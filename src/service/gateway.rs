//! Ingress gateway: the boundary for producers and new transports.
//!
//! Publish requests are validated here and never reach the delivery
//! engine when malformed. New transports are handed to the session
//! manager, which runs the handshake.

use std::sync::Arc;

use crate::domain::{ChannelId, ConnectionId, ConnectionRegistry, MessageEvent, Transport};
use crate::error::RelayError;
use crate::service::{DeliveryEngine, DeliveryReport, SessionManager};

/// Longest accepted event name.
pub const MAX_EVENT_NAME_LEN: usize = 200;

/// Unvalidated publish request from a trusted producer.
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    /// Target channel name.
    pub channel: String,
    /// Event name.
    pub event: String,
    /// Event payload; `None` or JSON `null` is rejected.
    pub payload: Option<serde_json::Value>,
    /// Sender identifier.
    pub origin: Option<String>,
}

/// Size limits enforced on publish.
#[derive(Debug, Clone, Copy)]
pub struct PublishLimits {
    /// Largest accepted payload, measured as serialized JSON bytes.
    pub max_payload_bytes: usize,
}

impl Default for PublishLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: 10_240,
        }
    }
}

/// Entry point for publishes and connection upgrades.
#[derive(Debug)]
pub struct IngressGateway {
    registry: Arc<ConnectionRegistry>,
    delivery: Arc<DeliveryEngine>,
    sessions: Arc<SessionManager>,
    limits: PublishLimits,
}

impl IngressGateway {
    /// Creates a gateway over explicitly constructed relay components.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        delivery: Arc<DeliveryEngine>,
        sessions: Arc<SessionManager>,
        limits: PublishLimits,
    ) -> Self {
        Self {
            registry,
            delivery,
            sessions,
            limits,
        }
    }

    /// Validates and publishes an event.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] for an empty or malformed
    /// channel, an empty event name, a missing payload, or an oversized
    /// payload.
    pub async fn publish(&self, request: PublishRequest) -> Result<DeliveryReport, RelayError> {
        let event = self.validate(request)?;
        self.delivery.publish(&event).await
    }

    /// Turns a publish request into a [`MessageEvent`] without side effects.
    ///
    /// # Errors
    ///
    /// See [`Self::publish`].
    pub fn validate(&self, request: PublishRequest) -> Result<MessageEvent, RelayError> {
        let channel = ChannelId::parse(request.channel)?;

        if request.event.is_empty() {
            return Err(RelayError::InvalidRequest(
                "event name must not be empty".to_string(),
            ));
        }
        if request.event.len() > MAX_EVENT_NAME_LEN {
            return Err(RelayError::InvalidRequest(format!(
                "event name exceeds {MAX_EVENT_NAME_LEN} characters"
            )));
        }

        let payload = match request.payload {
            None | Some(serde_json::Value::Null) => {
                return Err(RelayError::InvalidRequest("payload is required".to_string()));
            }
            Some(payload) => payload,
        };
        let size = serde_json::to_vec(&payload)
            .map_err(|e| RelayError::InvalidRequest(format!("payload is not serializable: {e}")))?
            .len();
        if size > self.limits.max_payload_bytes {
            return Err(RelayError::InvalidRequest(format!(
                "payload is {size} bytes; limit is {}",
                self.limits.max_payload_bytes
            )));
        }

        let origin = request.origin.filter(|o| !o.is_empty());
        Ok(MessageEvent::new(channel, request.event, payload, origin))
    }

    /// Hands a new transport to the session manager.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TransportFailure`] if the handshake greeting
    /// cannot be delivered.
    pub async fn accept(&self, transport: Arc<dyn Transport>) -> Result<ConnectionId, RelayError> {
        self.sessions.connect(transport).await
    }

    /// Session manager for per-connection commands.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Current member count of `channel`.
    #[must_use]
    pub fn member_count(&self, channel: &ChannelId) -> usize {
        self.registry.directory().member_count(channel)
    }

    /// Occupied channels with their member counts.
    #[must_use]
    pub fn channels(&self) -> Vec<(ChannelId, usize)> {
        self.registry.directory().channels()
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}
