//! Client-side connection state machine.
//!
//! Reconnecting is a transition like any other: `connect` is only legal
//! from a state that needs a connection, so callers never have to guess
//! whether a reconnect is due.

use std::fmt;

/// Connection state as seen by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Never connected.
    Initialized,
    /// Socket opening or waiting for `connection_established`.
    Connecting,
    /// Handshake complete.
    Connected,
    /// The connection dropped without the client asking.
    Unavailable,
    /// The client disconnected on purpose.
    Disconnected,
}

/// Inputs that drive [`ClientState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// Start opening a connection.
    Connect,
    /// The server confirmed the connection.
    Established,
    /// The socket failed or was closed by the server.
    ConnectionLost,
    /// The client asked to disconnect.
    Disconnect,
}

impl ClientState {
    /// Returns the state reached by applying `event`, if allowed.
    #[must_use]
    pub const fn transition(self, event: ClientEvent) -> Option<Self> {
        use ClientEvent::{Connect, ConnectionLost, Disconnect, Established};
        use ClientState::{Connected, Connecting, Disconnected, Initialized, Unavailable};

        match (self, event) {
            (Initialized | Unavailable | Disconnected, Connect) => Some(Connecting),
            (Connecting, Established) => Some(Connected),
            (Connecting | Connected, ConnectionLost) => Some(Unavailable),
            (Connecting | Connected | Unavailable, Disconnect) => Some(Disconnected),
            _ => None,
        }
    }

    /// Returns `true` if a `connect` is needed to reach `Connected`.
    #[must_use]
    pub const fn needs_connection(self) -> bool {
        matches!(self, Self::Initialized | Self::Unavailable | Self::Disconnected)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialized => "initialized",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Unavailable => "unavailable",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}
