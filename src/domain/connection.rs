//! Live client connection and its lifecycle state machine.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ChannelId, ConnectionId, Transport};

/// Liveness of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Transport accepted, handshake not yet completed.
    Connecting,
    /// Handshake completed; the connection may join and leave channels.
    Open,
    /// Disconnect requested; membership is being torn down.
    Closing,
    /// Terminal. A reconnecting client gets a new connection.
    Closed,
}

/// Inputs that drive [`ConnectionState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// The transport finished its handshake.
    HandshakeCompleted,
    /// A subscribe or unsubscribe was applied.
    MembershipChanged,
    /// The client (or the server) asked for an orderly disconnect.
    DisconnectRequested,
    /// Teardown after a disconnect request finished.
    CloseCompleted,
    /// The transport failed; abnormal termination.
    TransportFailed,
}

impl ConnectionState {
    /// Returns the state reached by applying `event`, or `None` if the
    /// event is not allowed in the current state.
    #[must_use]
    pub const fn transition(self, event: SessionEvent) -> Option<Self> {
        use ConnectionState::{Closed, Closing, Connecting, Open};
        use SessionEvent::{
            CloseCompleted, DisconnectRequested, HandshakeCompleted, MembershipChanged,
            TransportFailed,
        };

        match (self, event) {
            (Closed, _) => None,
            (_, TransportFailed) => Some(Closed),
            (Connecting, HandshakeCompleted) => Some(Open),
            (Connecting, DisconnectRequested) => Some(Closed),
            (Open, MembershipChanged) => Some(Open),
            (Open, DisconnectRequested) => Some(Closing),
            (Closing, CloseCompleted) => Some(Closed),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HandshakeCompleted => "handshake_completed",
            Self::MembershipChanged => "membership_changed",
            Self::DisconnectRequested => "disconnect_requested",
            Self::CloseCompleted => "close_completed",
            Self::TransportFailed => "transport_failed",
        };
        f.write_str(s)
    }
}

/// One live client transport together with its channel memberships.
///
/// Owned by [`super::ConnectionRegistry`]; callers only ever see clones.
/// The `channels` set mirrors the member sets in
/// [`super::ChannelDirectory`].
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    transport: Arc<dyn Transport>,
    channels: BTreeSet<ChannelId>,
    state: ConnectionState,
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// Wraps a freshly accepted transport in the `connecting` state.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            id: ConnectionId::new(),
            transport,
            channels: BTreeSet::new(),
            state: ConnectionState::Connecting,
            connected_at: Utc::now(),
        }
    }

    /// Connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Shared handle to the transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Channels this connection is currently a member of.
    #[must_use]
    pub const fn channels(&self) -> &BTreeSet<ChannelId> {
        &self.channels
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// When the transport was accepted.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    pub(crate) fn channels_mut(&mut self) -> &mut BTreeSet<ChannelId> {
        &mut self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::*;
    use super::SessionEvent::*;

    #[test]
    fn happy_path_lifecycle() {
        assert_eq!(Connecting.transition(HandshakeCompleted), Some(Open));
        assert_eq!(Open.transition(MembershipChanged), Some(Open));
        assert_eq!(Open.transition(DisconnectRequested), Some(Closing));
        assert_eq!(Closing.transition(CloseCompleted), Some(Closed));
    }

    #[test]
    fn transport_failure_skips_closing() {
        for state in [Connecting, Open, Closing] {
            assert_eq!(state.transition(TransportFailed), Some(Closed));
        }
    }

    #[test]
    fn closed_is_terminal() {
        for event in [
            HandshakeCompleted,
            MembershipChanged,
            DisconnectRequested,
            CloseCompleted,
            TransportFailed,
        ] {
            assert_eq!(Closed.transition(event), None);
        }
    }

    #[test]
    fn membership_requires_open() {
        assert_eq!(Connecting.transition(MembershipChanged), None);
        assert_eq!(Closing.transition(MembershipChanged), None);
    }

    #[test]
    fn disconnect_before_handshake_closes_directly() {
        assert_eq!(Connecting.transition(DisconnectRequested), Some(Closed));
    }
}
