//! Client → server WebSocket commands.
//!
//! Server → client frames are [`crate::domain::ServerFrame`]s.

use serde::{Deserialize, Serialize};

/// Envelope for every text frame a client sends.
///
/// ```json
/// { "id": "7", "command": "subscribe", "channel": "programming" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    /// Optional client-chosen id, echoed in the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The command itself.
    #[serde(flatten)]
    pub command: ClientCommand,
}

/// Commands that a client can send over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Join a channel.
    Subscribe {
        /// Channel name.
        channel: String,
    },
    /// Leave a channel.
    Unsubscribe {
        /// Channel name.
        channel: String,
    },
    /// Keep-alive; answered with `pong`.
    Ping,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_subscribe_with_id() {
        let Ok(frame) = serde_json::from_str::<ClientFrame>(
            r#"{"id":"1","command":"subscribe","channel":"programming"}"#,
        ) else {
            panic!("should parse");
        };
        assert_eq!(frame.id.as_deref(), Some("1"));
        assert_eq!(
            frame.command,
            ClientCommand::Subscribe {
                channel: "programming".to_string()
            }
        );
    }

    #[test]
    fn parses_ping_without_id() {
        let Ok(frame) = serde_json::from_str::<ClientFrame>(r#"{"command":"ping"}"#) else {
            panic!("should parse");
        };
        assert_eq!(frame.command, ClientCommand::Ping);
        assert!(frame.id.is_none());
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"command":"swap"}"#).is_err());
    }
}
