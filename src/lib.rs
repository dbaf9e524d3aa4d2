//! # channel-relay
//!
//! Self-hosted, channel-based publish/subscribe relay.
//!
//! Trusted producers publish events over HTTP; browser or native clients
//! open a WebSocket, join named channels, and receive every event
//! published to those channels while they are members. Delivery is live
//! broadcast: best-effort, at-most-once, nothing is stored.
//!
//! ## Architecture
//!
//! ```text
//! Producers (HTTP)          Clients (WebSocket)
//!     │                          │
//!     ├── REST Handlers (api/)   ├── WS adapter (ws/)
//!     │                          │
//!     └──────── IngressGateway (service/) ────────┐
//!                 │                               │
//!          DeliveryEngine (service/)     SessionManager (service/)
//!                 │                               │
//!          ConnectionRegistry ◄──────────────────┘
//!                 │            (domain/)
//!          ChannelDirectory
//! ```
//!
//! The [`client`] module provides a matching WebSocket client.

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
