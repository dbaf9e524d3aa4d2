//! Session lifecycle: connect, subscribe, unsubscribe, disconnect, fail.
//!
//! Every transition goes through the connection's state machine in the
//! registry. Disconnect and failure are idempotent: tearing down a
//! connection that is already gone does nothing.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    ChannelId, Connection, ConnectionId, ConnectionRegistry, MembershipChange, ServerFrame,
    SessionEvent, Transport, events,
};
use crate::error::RelayError;
use crate::service::DeliveryEngine;

/// Tunables for [`SessionManager`].
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Push `subscription_count` to channel members on membership change.
    pub membership_notifications: bool,
    /// Idle period after which the transport drops a silent client.
    /// Advertised to clients in `connection_established`.
    pub activity_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            membership_notifications: true,
            activity_timeout: Duration::from_secs(120),
        }
    }
}

/// Drives per-connection lifecycle transitions.
#[derive(Debug)]
pub struct SessionManager {
    registry: Arc<ConnectionRegistry>,
    delivery: Arc<DeliveryEngine>,
    options: SessionOptions,
}

impl SessionManager {
    /// Creates a session manager over an explicitly constructed registry
    /// and delivery engine.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        delivery: Arc<DeliveryEngine>,
        options: SessionOptions,
    ) -> Self {
        Self {
            registry,
            delivery,
            options,
        }
    }

    /// Session options in effect.
    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Registers a transport that completed its handshake and opens it.
    ///
    /// Sends `connection_established` carrying the new connection id.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TransportFailure`] if the greeting cannot be
    /// sent; the connection is torn down before returning.
    pub async fn connect(&self, transport: Arc<dyn Transport>) -> Result<ConnectionId, RelayError> {
        let id = self.registry.register(Connection::new(Arc::clone(&transport)));
        self.registry
            .transition(id, SessionEvent::HandshakeCompleted)?;

        let greeting = ServerFrame::control(
            events::CONNECTION_ESTABLISHED,
            serde_json::json!({
                "connection_id": id,
                "activity_timeout": self.options.activity_timeout.as_secs(),
            }),
        )
        .encode()?;

        if let Err(err) = transport.send(greeting).await {
            self.fail(id, &err.to_string()).await;
            return Err(err.into());
        }

        tracing::info!(connection_id = %id, "connection opened");
        Ok(id)
    }

    /// Joins `channel`. Joining twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConnectionNotFound`] or
    /// [`RelayError::ConnectionNotOpen`]; membership is unchanged then.
    pub async fn subscribe(
        &self,
        id: ConnectionId,
        channel: &ChannelId,
    ) -> Result<MembershipChange, RelayError> {
        let change = self.registry.join(id, channel)?;
        if change.changed {
            tracing::debug!(connection_id = %id, %channel, members = change.member_count, "subscribed");
            self.announce(channel, change.member_count).await;
        } else {
            tracing::debug!(connection_id = %id, %channel, "duplicate subscribe ignored");
        }
        Ok(change)
    }

    /// Leaves `channel`. Leaving a channel never joined is a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`Self::subscribe`].
    pub async fn unsubscribe(
        &self,
        id: ConnectionId,
        channel: &ChannelId,
    ) -> Result<MembershipChange, RelayError> {
        let change = self.registry.leave(id, channel)?;
        if change.changed {
            tracing::debug!(connection_id = %id, %channel, members = change.member_count, "unsubscribed");
            self.announce(channel, change.member_count).await;
        }
        Ok(change)
    }

    /// Orderly disconnect: `open → closing → closed`.
    ///
    /// Closes the transport, then removes the connection from every channel.
    pub async fn disconnect(&self, id: ConnectionId) {
        match self.registry.transition(id, SessionEvent::DisconnectRequested) {
            Ok(_) => {}
            Err(RelayError::ConnectionNotFound(_)) => return,
            Err(err) => {
                tracing::debug!(connection_id = %id, error = %err, "disconnect ignored");
                return;
            }
        }

        let Some(snapshot) = self.registry.get(id) else {
            return;
        };
        snapshot.transport().close().await;
        // A connection still in `connecting` is already closed at this point.
        let _ = self.registry.transition(id, SessionEvent::CloseCompleted);

        // A failing fan-out may have unregistered the connection while its
        // transport was closing; that path stays silent, so announce here.
        let departed = self.registry.unregister(id).unwrap_or(snapshot);
        tracing::info!(connection_id = %id, "connection closed");
        self.announce_departure(&departed).await;
    }

    /// Abnormal termination: any state goes straight to `closed`.
    pub async fn fail(&self, id: ConnectionId, reason: &str) {
        if self
            .registry
            .transition(id, SessionEvent::TransportFailed)
            .is_err()
        {
            return;
        }
        let Some(connection) = self.registry.unregister(id) else {
            return;
        };
        tracing::warn!(connection_id = %id, reason, "connection failed");
        connection.transport().close().await;
        self.announce_departure(&connection).await;
    }

    /// Returns a copy of a live connection.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<Connection> {
        self.registry.get(id)
    }

    async fn announce(&self, channel: &ChannelId, member_count: usize) {
        if self.options.membership_notifications && member_count > 0 {
            self.delivery
                .notify_subscription_count(channel, member_count)
                .await;
        }
    }

    async fn announce_departure(&self, connection: &Connection) {
        for channel in connection.channels() {
            let count = self.registry.directory().member_count(channel);
            self.announce(channel, count).await;
        }
    }
}
