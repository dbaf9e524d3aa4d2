//! Delivery engine: snapshot membership, then fan out independently.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    ChannelId, ConnectionId, ConnectionRegistry, MessageEvent, ServerFrame, SessionEvent,
    Transport, TransportError, events,
};
use crate::error::RelayError;

/// Outcome of one publish.
///
/// `attempted` always equals the channel's member count at snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeliveryReport {
    /// Members in the snapshot.
    pub attempted: usize,
    /// Sends that succeeded.
    pub delivered: usize,
    /// Sends that failed; those recipients were torn down.
    pub failed: usize,
}

/// Fans published events out to the current members of a channel.
///
/// Delivery is best-effort and at-most-once: there is no acknowledgment
/// and no retry. Each recipient is sent to independently, so a failure for
/// one never prevents delivery to the others.
#[derive(Debug)]
pub struct DeliveryEngine {
    registry: Arc<ConnectionRegistry>,
}

impl DeliveryEngine {
    /// Creates an engine reading membership from `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Publishes `event` to every member of its channel.
    ///
    /// Membership is read once, before the first send. Members that join
    /// later do not receive the event; members that leave or fail mid-way
    /// are counted as failed attempts.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] only if the event cannot be
    /// serialized. Per-recipient failures are reported, not returned.
    pub async fn publish(&self, event: &MessageEvent) -> Result<DeliveryReport, RelayError> {
        let members = self.registry.directory().members(&event.channel);
        if members.is_empty() {
            tracing::debug!(channel = %event.channel, event = %event.event, "no members; publish dropped");
            return Ok(DeliveryReport::default());
        }

        let frame = ServerFrame::from(event).encode()?;
        let report = self.fan_out(&members, frame).await;

        tracing::debug!(
            channel = %event.channel,
            event = %event.event,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "event published"
        );
        Ok(report)
    }

    /// Pushes the advisory `subscription_count` event to a channel.
    pub async fn notify_subscription_count(&self, channel: &ChannelId, count: usize) {
        let event = MessageEvent::new(
            channel.clone(),
            events::SUBSCRIPTION_COUNT,
            serde_json::json!({ "subscription_count": count }),
            None,
        );
        if let Err(err) = self.publish(&event).await {
            tracing::warn!(%channel, error = %err, "subscription count notification failed");
        }
    }

    async fn fan_out(&self, members: &[ConnectionId], frame: Arc<str>) -> DeliveryReport {
        let sends = self
            .registry
            .resolve(members)
            .into_iter()
            .map(|(id, transport)| {
                let frame = Arc::clone(&frame);
                async move {
                    let result = match &transport {
                        Some(t) => t.send(frame).await,
                        None => Err(TransportError::Closed),
                    };
                    (id, transport, result)
                }
            });
        let results = join_all(sends).await;

        let mut report = DeliveryReport {
            attempted: results.len(),
            ..DeliveryReport::default()
        };
        for (id, transport, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(connection_id = %id, error = %err, "delivery failed");
                    self.drop_recipient(id, transport).await;
                }
            }
        }
        report
    }

    /// Tears down a recipient whose send failed.
    async fn drop_recipient(&self, id: ConnectionId, transport: Option<Arc<dyn Transport>>) {
        // Not found or already closing: the disconnect path owns the teardown.
        if self
            .registry
            .transition(id, SessionEvent::TransportFailed)
            .is_ok()
        {
            self.registry.unregister(id);
        }
        if let Some(transport) = transport {
            transport.close().await;
        }
    }
}
