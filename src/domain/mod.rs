//! Domain layer: identifiers, connections, channel membership, and frames.
//!
//! This module holds the in-memory relay state: the
//! [`ConnectionRegistry`] owning live connections, the
//! [`ChannelDirectory`] indexing channel membership, and the
//! [`Transport`] seam through which frames leave the process.

pub mod channel_directory;
pub mod channel_id;
pub mod connection;
pub mod connection_id;
pub mod connection_registry;
pub mod frame;
pub mod message_event;
pub mod transport;

pub use channel_directory::{ChannelDirectory, MembershipChange};
pub use channel_id::ChannelId;
pub use connection::{Connection, ConnectionState, SessionEvent};
pub use connection_id::ConnectionId;
pub use connection_registry::ConnectionRegistry;
pub use frame::{ServerFrame, events};
pub use message_event::MessageEvent;
pub use transport::{Transport, TransportError};
