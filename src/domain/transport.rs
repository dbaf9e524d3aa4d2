//! Transport primitives consumed by the relay core.
//!
//! The delivery engine and session manager only see a [`Transport`]: a
//! handle that can push an already-serialized frame to one client and close
//! it. The WebSocket adapter in `ws/` is one implementation; tests use
//! in-memory ones.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Failure to push a frame over a single client transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer or the local writer has gone away.
    #[error("transport closed")]
    Closed,

    /// The frame could not be queued within the send timeout.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    /// Any other I/O level failure.
    #[error("transport i/o error: {0}")]
    Io(String),
}

/// Send/close primitives for one live client connection.
///
/// Implementations must be cheap to share: the registry keeps one
/// `Arc<dyn Transport>` per connection and fan-out clones it per publish.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Pushes one serialized frame to the client.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the frame cannot be handed to the
    /// underlying connection.
    async fn send(&self, frame: Arc<str>) -> Result<(), TransportError>;

    /// Closes the transport. Closing twice is harmless.
    async fn close(&self);
}
