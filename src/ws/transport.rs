//! [`Transport`] implementation backed by a WebSocket writer task.
//!
//! Frames are queued on a bounded channel drained by the connection's
//! writer task, so a slow client never blocks the publisher for longer
//! than the send timeout. Closing flips a shared flag that the connection
//! loop watches; the queue may be full, so the flag is the signal and the
//! close marker is only a courtesy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::domain::{Transport, TransportError};

/// Items consumed by the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A serialized text frame.
    Frame(Arc<str>),
    /// Send a close frame and stop writing.
    Close,
}

/// Queue-backed transport handle for one WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsTransport {
    tx: mpsc::Sender<Outbound>,
    send_timeout: Duration,
    closed: Arc<watch::Sender<bool>>,
}

impl WsTransport {
    /// Creates a transport and the receiving end for its writer task.
    #[must_use]
    pub fn channel(buffer: usize, send_timeout: Duration) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let (closed, _) = watch::channel(false);
        let transport = Self {
            tx,
            send_timeout,
            closed: Arc::new(closed),
        };
        (transport, rx)
    }

    /// Receiver for the closed flag; it turns `true` once `close` has been
    /// called on any clone of this transport.
    #[must_use]
    pub fn closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    /// Returns `true` once the transport has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    async fn enqueue(&self, item: Outbound) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        match tokio::time::timeout(self.send_timeout, self.tx.send(item)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::Timeout(self.send_timeout)),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, frame: Arc<str>) -> Result<(), TransportError> {
        self.enqueue(Outbound::Frame(frame)).await
    }

    async fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        // Full queue or writer gone: the connection loop still sees the flag.
        let _ = self.tx.try_send(Outbound::Close);
    }
}
