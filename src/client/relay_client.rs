//! WebSocket client for the relay.

use std::collections::BTreeSet;
use std::fmt;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::bindings::{BindingId, EventBindings};
use super::state::{ClientEvent, ClientState};
use crate::domain::{ServerFrame, events};
use crate::ws::messages::{ClientCommand, ClientFrame};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client-side failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// WebSocket protocol or I/O failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be encoded or decoded.
    #[error("invalid frame: {0}")]
    Frame(#[from] serde_json::Error),

    /// The operation is not allowed in the current state.
    #[error("cannot {action} while {state}")]
    InvalidState {
        /// Attempted operation.
        action: &'static str,
        /// State the client was in.
        state: ClientState,
    },

    /// The socket closed before `connection_established` arrived.
    #[error("connection closed during handshake")]
    HandshakeFailed,
}

/// Relay client: connects, subscribes, and dispatches frames to bindings.
///
/// ```no_run
/// # async fn demo() -> Result<(), channel_relay::client::ClientError> {
/// use channel_relay::client::RelayClient;
///
/// let mut client = RelayClient::new("ws://localhost:3000/ws");
/// client.connect().await?;
/// client.subscribe("programming").await?;
/// client.bind_channel("programming", "message-in", |frame| {
///     println!("{}", frame.payload["message"]);
/// });
/// while let Some(_frame) = client.next_frame().await? {}
/// # Ok(())
/// # }
/// ```
pub struct RelayClient {
    url: String,
    state: ClientState,
    socket: Option<Socket>,
    connection_id: Option<String>,
    channels: BTreeSet<String>,
    replay_subscriptions: bool,
    bindings: EventBindings,
}

impl fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayClient")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("connection_id", &self.connection_id)
            .field("channels", &self.channels)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl RelayClient {
    /// Creates a client for the relay's `/ws` URL. Nothing is opened yet.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: ClientState::Initialized,
            socket: None,
            connection_id: None,
            channels: BTreeSet::new(),
            replay_subscriptions: true,
            bindings: EventBindings::new(),
        }
    }

    /// Whether channels are re-subscribed after a reconnect (default `true`).
    #[must_use]
    pub fn with_replay_subscriptions(mut self, replay: bool) -> Self {
        self.replay_subscriptions = replay;
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// Identifier assigned by the relay for the current connection.
    #[must_use]
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Channels the client wants to be subscribed to.
    #[must_use]
    pub const fn channels(&self) -> &BTreeSet<String> {
        &self.channels
    }

    /// Opens the connection if the state machine says one is needed.
    ///
    /// Already connected or connecting is a no-op. After a reconnect the
    /// previous channel set is replayed when enabled.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the socket cannot be opened or the
    /// handshake does not complete; the client is then `Unavailable`.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if !self.state.needs_connection() {
            return Ok(());
        }
        self.apply(ClientEvent::Connect, "connect")?;

        if let Err(err) = self.open().await {
            self.lost();
            return Err(err);
        }
        self.apply(ClientEvent::Established, "connect")?;
        tracing::debug!(url = %self.url, connection_id = ?self.connection_id, "relay connected");

        if self.replay_subscriptions {
            self.replay().await?;
        }
        Ok(())
    }

    /// Re-sends a subscribe for every remembered channel. A failed send
    /// means the fresh socket is already unusable.
    async fn replay(&mut self) -> Result<(), ClientError> {
        let channels: Vec<_> = self.channels.iter().cloned().collect();
        for channel in channels {
            if let Err(err) = self.send_command(ClientCommand::Subscribe { channel }).await {
                self.lost();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Joins a channel.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] unless connected, or a send error.
    pub async fn subscribe(&mut self, channel: &str) -> Result<(), ClientError> {
        self.require_connected("subscribe")?;
        self.channels.insert(channel.to_string());
        self.send_command(ClientCommand::Subscribe {
            channel: channel.to_string(),
        })
        .await
    }

    /// Leaves a channel and drops the handlers bound to it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::subscribe`].
    pub async fn unsubscribe(&mut self, channel: &str) -> Result<(), ClientError> {
        self.require_connected("unsubscribe")?;
        self.channels.remove(channel);
        self.bindings.unbind_channel(channel);
        self.send_command(ClientCommand::Unsubscribe {
            channel: channel.to_string(),
        })
        .await
    }

    /// Sends a keep-alive ping.
    ///
    /// # Errors
    ///
    /// Same as [`Self::subscribe`].
    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.require_connected("ping")?;
        self.send_command(ClientCommand::Ping).await
    }

    /// Binds a handler to an event on any channel.
    pub fn bind(
        &mut self,
        event: &str,
        handler: impl FnMut(&ServerFrame) + Send + 'static,
    ) -> BindingId {
        self.bindings.bind(event, None, handler)
    }

    /// Binds a handler to an event on one channel.
    pub fn bind_channel(
        &mut self,
        channel: &str,
        event: &str,
        handler: impl FnMut(&ServerFrame) + Send + 'static,
    ) -> BindingId {
        self.bindings.bind(event, Some(channel.to_string()), handler)
    }

    /// Removes a handler.
    pub fn unbind(&mut self, id: BindingId) -> bool {
        self.bindings.unbind(id)
    }

    /// Reads the next frame and runs its bound handlers.
    ///
    /// Returns `Ok(None)` when the server closes the connection; the client
    /// is then `Unavailable` and may `connect` again.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] when not connected, or the
    /// socket/decoding error that ended the connection.
    pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>, ClientError> {
        let state = self.state;
        let socket = self.socket.as_mut().ok_or(ClientError::InvalidState {
            action: "read",
            state,
        })?;
        match read_frame(socket).await {
            Ok(Some(frame)) => {
                self.bindings.dispatch(&frame);
                Ok(Some(frame))
            }
            Ok(None) => {
                self.lost();
                Ok(None)
            }
            Err(err) => {
                self.lost();
                Err(err)
            }
        }
    }

    /// Closes the connection on purpose.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] if there is nothing to close.
    pub async fn disconnect(&mut self) -> Result<(), ClientError> {
        self.apply(ClientEvent::Disconnect, "disconnect")?;
        self.connection_id = None;
        if let Some(mut socket) = self.socket.take() {
            // The peer may already be gone.
            let _ = socket.close(None).await;
        }
        Ok(())
    }

    async fn open(&mut self) -> Result<(), ClientError> {
        let (mut socket, _response) = connect_async(self.url.as_str()).await?;
        loop {
            let frame = read_frame(&mut socket)
                .await?
                .ok_or(ClientError::HandshakeFailed)?;
            if frame.event == events::CONNECTION_ESTABLISHED {
                self.connection_id = frame
                    .payload
                    .get("connection_id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                self.socket = Some(socket);
                return Ok(());
            }
        }
    }

    async fn send_command(&mut self, command: ClientCommand) -> Result<(), ClientError> {
        let state = self.state;
        let socket = self.socket.as_mut().ok_or(ClientError::InvalidState {
            action: "send",
            state,
        })?;
        let text = serde_json::to_string(&ClientFrame { id: None, command })?;
        socket.send(Message::text(text)).await?;
        Ok(())
    }

    fn require_connected(&self, action: &'static str) -> Result<(), ClientError> {
        if self.state == ClientState::Connected {
            Ok(())
        } else {
            Err(ClientError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    fn apply(&mut self, event: ClientEvent, action: &'static str) -> Result<(), ClientError> {
        self.state = self
            .state
            .transition(event)
            .ok_or(ClientError::InvalidState {
                action,
                state: self.state,
            })?;
        Ok(())
    }

    fn lost(&mut self) {
        self.socket = None;
        self.connection_id = None;
        if let Some(next) = self.state.transition(ClientEvent::ConnectionLost) {
            self.state = next;
        }
    }
}

async fn read_frame(socket: &mut Socket) -> Result<Option<ServerFrame>, ClientError> {
    while let Some(message) = socket.next().await {
        match message? {
            Message::Text(text) => return Ok(Some(serde_json::from_str(text.as_str())?)),
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }
    Ok(None)
}
