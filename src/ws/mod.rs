//! WebSocket layer: transport adapter, read loop, and client commands.
//!
//! The WebSocket endpoint at `/ws` turns each upgraded socket into a
//! [`crate::domain::Transport`] and hands it to the ingress gateway.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod transport;
