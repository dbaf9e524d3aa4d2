//! WebSocket connection loop.
//!
//! Splits the socket into a writer task fed by [`WsTransport`] and a read
//! loop that dispatches client commands to the session manager. A clean
//! close ends in `disconnect`; read errors and idle timeouts end in `fail`.
//! A transport closed from elsewhere (a failed fan-out) ends the loop too,
//! and the socket is dropped without waiting for the writer.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use super::messages::{ClientCommand, ClientFrame};
use super::transport::{Outbound, WsTransport};
use crate::app_state::AppState;
use crate::domain::{ChannelId, ConnectionId, ServerFrame, Transport, events};
use crate::error::RelayError;
use crate::service::SessionManager;

/// How the read loop ended.
#[derive(Debug)]
enum Termination {
    Closed,
    Failed(String),
    /// The session was already torn down; only the socket is left.
    Evicted,
}

/// Runs the read/write loops for a single WebSocket connection.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let (ws_tx, ws_rx) = socket.split();
    let (transport, outbound) =
        WsTransport::channel(state.config.outbound_buffer, state.config.send_timeout);
    let transport = Arc::new(transport);
    let writer = tokio::spawn(write_loop(ws_tx, outbound));

    let gateway = Arc::clone(&state.gateway);
    let id = match gateway
        .accept(Arc::clone(&transport) as Arc<dyn Transport>)
        .await
    {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(error = %err, "ws handshake failed");
            writer.abort();
            return;
        }
    };
    let sessions = gateway.sessions();

    let termination = read_loop(
        ws_rx,
        &transport,
        id,
        sessions,
        state.config.activity_timeout,
    )
    .await;

    match termination {
        Termination::Closed => sessions.disconnect(id).await,
        Termination::Failed(reason) => sessions.fail(id, &reason).await,
        Termination::Evicted => {
            tracing::debug!(connection_id = %id, "transport closed by relay");
            writer.abort();
        }
    }

    drop(transport);
    let abort = writer.abort_handle();
    if tokio::time::timeout(state.config.send_timeout, writer)
        .await
        .is_err()
    {
        abort.abort();
    }
    tracing::debug!(connection_id = %id, "ws connection closed");
}

/// Reads client frames until the client leaves, goes idle, errors, or the
/// transport is closed underneath it.
async fn read_loop<S>(
    mut ws_rx: S,
    transport: &WsTransport,
    id: ConnectionId,
    sessions: &SessionManager,
    idle: Duration,
) -> Termination
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let mut closed = transport.closed();
    loop {
        let next = tokio::select! {
            _ = closed.wait_for(|closed| *closed) => return Termination::Evicted,
            next = tokio::time::timeout(idle, ws_rx.next()) => next,
        };
        let next = match next {
            Ok(next) => next,
            Err(_) => return Termination::Failed("activity timeout".to_string()),
        };
        match next {
            Some(Ok(Message::Text(text))) => {
                let reply = handle_text_message(&text, id, sessions).await;
                match reply.encode() {
                    Ok(frame) => {
                        if let Err(err) = transport.send(frame).await {
                            return Termination::Failed(err.to_string());
                        }
                    }
                    Err(err) => tracing::warn!(connection_id = %id, error = %err, "reply dropped"),
                }
            }
            Some(Ok(Message::Close(_))) | None => return Termination::Closed,
            Some(Err(err)) => return Termination::Failed(err.to_string()),
            // Ping/pong are answered by axum; binary frames are ignored.
            Some(Ok(_)) => {}
        }
    }
}

/// Drains the outbound queue into the socket.
async fn write_loop(mut ws_tx: SplitSink<WebSocket, Message>, mut outbound: mpsc::Receiver<Outbound>) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                if ws_tx.send(Message::text(frame.as_ref())).await.is_err() {
                    break;
                }
            }
            Outbound::Close => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

/// Handles a text message from the client, returning the reply frame.
async fn handle_text_message(text: &str, id: ConnectionId, sessions: &SessionManager) -> ServerFrame {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(err) => return ServerFrame::error(1001, format!("malformed frame: {err}")),
    };
    dispatch(frame.command, id, sessions)
        .await
        .unwrap_or_else(|err| ServerFrame::error(err.error_code(), err.to_string()))
        .with_id(frame.id)
}

async fn dispatch(
    command: ClientCommand,
    id: ConnectionId,
    sessions: &SessionManager,
) -> Result<ServerFrame, RelayError> {
    match command {
        ClientCommand::Subscribe { channel } => {
            let channel = ChannelId::parse(channel)?;
            let change = sessions.subscribe(id, &channel).await?;
            Ok(ServerFrame::control(
                events::SUBSCRIPTION_SUCCEEDED,
                serde_json::json!({ "subscription_count": change.member_count }),
            )
            .with_channel(channel))
        }
        ClientCommand::Unsubscribe { channel } => {
            let channel = ChannelId::parse(channel)?;
            let change = sessions.unsubscribe(id, &channel).await?;
            Ok(ServerFrame::control(
                events::UNSUBSCRIBED,
                serde_json::json!({ "subscription_count": change.member_count }),
            )
            .with_channel(channel))
        }
        ClientCommand::Ping => Ok(ServerFrame::control(events::PONG, serde_json::Value::Null)),
    }
}
