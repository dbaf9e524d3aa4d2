//! Publish request/response DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::{DeliveryReport, PublishRequest};

/// Request body for `POST /api/v1/events`.
///
/// Fields default to empty so that missing values are reported as
/// validation errors by the gateway rather than as decode failures.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PublishEventRequest {
    /// Target channel name.
    #[serde(default)]
    pub channel: String,
    /// Event name, e.g. `"message-in"`.
    #[serde(default)]
    pub event: String,
    /// Arbitrary JSON payload (required, must not be `null`).
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Option<serde_json::Value>,
    /// Producer identifier, echoed to receivers as `origin`.
    #[serde(default)]
    pub origin: Option<String>,
}

impl From<PublishEventRequest> for PublishRequest {
    fn from(req: PublishEventRequest) -> Self {
        Self {
            channel: req.channel,
            event: req.event,
            payload: req.payload,
            origin: req.origin,
        }
    }
}

/// Response body for `POST /api/v1/events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublishEventResponse {
    /// Channel the event was published to.
    pub channel: String,
    /// Event name.
    pub event: String,
    /// Fan-out outcome.
    pub delivery: DeliveryReport,
}

/// Chat message posted by the browser client to `POST /message`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MessagePost {
    /// Message text.
    #[serde(default)]
    pub message: String,
    /// Display name of the sender.
    #[serde(default)]
    pub sender: String,
    /// Client timestamp in milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Target channel name.
    #[serde(default)]
    pub channel: String,
    /// Random per-browser id used to tell outgoing from incoming messages.
    #[serde(default)]
    pub user_id: Option<String>,
}
