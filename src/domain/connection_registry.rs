//! Registry of live client connections.
//!
//! [`ConnectionRegistry`] owns every [`Connection`] and keeps each
//! connection's channel set mirrored with the member sets in
//! [`ChannelDirectory`]: both sides are updated under the registry lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    ChannelDirectory, ChannelId, Connection, ConnectionId, ConnectionState, MembershipChange,
    SessionEvent, Transport,
};
use crate::error::RelayError;

/// Central store for live connections.
///
/// # Concurrency
///
/// - One mutex guards the connection map; it is never held across I/O.
/// - Lock order is registry → directory. `join`, `leave` and `unregister`
///   take both, which makes the two mirrored sets change together.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    directory: Arc<ChannelDirectory>,
}

impl ConnectionRegistry {
    /// Creates an empty registry backed by `directory`.
    #[must_use]
    pub fn new(directory: Arc<ChannelDirectory>) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            directory,
        }
    }

    /// Returns the channel directory this registry keeps in sync.
    #[must_use]
    pub fn directory(&self) -> &Arc<ChannelDirectory> {
        &self.directory
    }

    /// Adds a connection and returns its identifier.
    pub fn register(&self, connection: Connection) -> ConnectionId {
        let id = connection.id();
        self.connections.lock().insert(id, connection);
        tracing::debug!(connection_id = %id, "connection registered");
        id
    }

    /// Removes a connection and drops it from every channel it had joined.
    ///
    /// Returns the removed connection (state `closed`) or `None` if it was
    /// already gone; calling this twice is harmless.
    pub fn unregister(&self, id: ConnectionId) -> Option<Connection> {
        let mut map = self.connections.lock();
        let mut connection = map.remove(&id)?;
        for channel in connection.channels() {
            self.directory.unsubscribe(channel, id);
        }
        connection.set_state(ConnectionState::Closed);
        drop(map);

        tracing::debug!(
            connection_id = %id,
            channels = connection.channels().len(),
            "connection unregistered"
        );
        Some(connection)
    }

    /// Returns a copy of the connection, if registered.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.lock().get(&id).cloned()
    }

    /// Applies a lifecycle event to a registered connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConnectionNotFound`] if the connection is not
    /// registered, or [`RelayError::IllegalTransition`] if the event is not
    /// allowed in its current state.
    pub fn transition(
        &self,
        id: ConnectionId,
        event: SessionEvent,
    ) -> Result<ConnectionState, RelayError> {
        let mut map = self.connections.lock();
        let connection = map.get_mut(&id).ok_or(RelayError::ConnectionNotFound(id))?;
        let from = connection.state();
        let to = from
            .transition(event)
            .ok_or(RelayError::IllegalTransition { id, from, event })?;
        connection.set_state(to);
        Ok(to)
    }

    /// Adds the connection to `channel` on both sides of the mirror.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConnectionNotFound`] for unknown connections and
    /// [`RelayError::ConnectionNotOpen`] unless the connection is `open`.
    pub fn join(
        &self,
        id: ConnectionId,
        channel: &ChannelId,
    ) -> Result<MembershipChange, RelayError> {
        let mut map = self.connections.lock();
        let connection = open_connection(&mut map, id)?;
        let change = self.directory.subscribe(channel, id);
        connection.channels_mut().insert(channel.clone());
        Ok(change)
    }

    /// Removes the connection from `channel` on both sides of the mirror.
    ///
    /// # Errors
    ///
    /// Same as [`Self::join`].
    pub fn leave(
        &self,
        id: ConnectionId,
        channel: &ChannelId,
    ) -> Result<MembershipChange, RelayError> {
        let mut map = self.connections.lock();
        let connection = open_connection(&mut map, id)?;
        let change = self.directory.unsubscribe(channel, id);
        connection.channels_mut().remove(channel);
        Ok(change)
    }

    /// Looks up the transport for each id in a membership snapshot.
    ///
    /// Connections that disappeared since the snapshot resolve to `None`.
    #[must_use]
    pub fn resolve(&self, ids: &[ConnectionId]) -> Vec<(ConnectionId, Option<Arc<dyn Transport>>)> {
        let map = self.connections.lock();
        ids.iter()
            .map(|id| (*id, map.get(id).map(|c| Arc::clone(c.transport()))))
            .collect()
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Returns `true` if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

fn open_connection(
    map: &mut HashMap<ConnectionId, Connection>,
    id: ConnectionId,
) -> Result<&mut Connection, RelayError> {
    let connection = map.get_mut(&id).ok_or(RelayError::ConnectionNotFound(id))?;
    let state = connection.state();
    if state.transition(SessionEvent::MembershipChanged).is_none() {
        return Err(RelayError::ConnectionNotOpen { id, state });
    }
    Ok(connection)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::transport::testing::RecordingTransport;

    fn channel(name: &str) -> ChannelId {
        let Ok(id) = ChannelId::parse(name) else {
            panic!("valid channel name");
        };
        id
    }

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(Arc::new(ChannelDirectory::new()))
    }

    fn open(registry: &ConnectionRegistry) -> ConnectionId {
        let id = registry.register(Connection::new(RecordingTransport::new()));
        let Ok(ConnectionState::Open) = registry.transition(id, SessionEvent::HandshakeCompleted)
        else {
            panic!("handshake should open the connection");
        };
        id
    }

    /// Checks the mirrored-set invariant for every connection and channel.
    fn assert_mirrored(registry: &ConnectionRegistry, ids: &[ConnectionId]) {
        let dir = registry.directory();
        for id in ids {
            if let Some(conn) = registry.get(*id) {
                for ch in conn.channels() {
                    assert!(dir.is_member(ch, *id), "{id} missing from {ch}");
                }
            }
        }
        for (ch, _) in dir.channels() {
            for member in dir.members(&ch) {
                let Some(conn) = registry.get(member) else {
                    panic!("directory references unregistered {member}");
                };
                assert!(conn.channels().contains(&ch));
            }
        }
    }

    #[test]
    fn register_and_get() {
        let registry = registry();
        let conn = Connection::new(RecordingTransport::new());
        let id = registry.register(conn);
        let Some(fetched) = registry.get(id) else {
            panic!("connection should be registered");
        };
        assert_eq!(fetched.state(), ConnectionState::Connecting);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_unknown_returns_none() {
        assert!(registry().get(ConnectionId::new()).is_none());
    }

    #[test]
    fn join_requires_open_connection() {
        let registry = registry();
        let id = registry.register(Connection::new(RecordingTransport::new()));
        let result = registry.join(id, &channel("programming"));
        assert!(matches!(
            result,
            Err(RelayError::ConnectionNotOpen {
                state: ConnectionState::Connecting,
                ..
            })
        ));
    }

    #[test]
    fn join_unknown_connection_fails() {
        let result = registry().join(ConnectionId::new(), &channel("programming"));
        assert!(matches!(result, Err(RelayError::ConnectionNotFound(_))));
    }

    #[test]
    fn join_and_leave_keep_sets_mirrored() {
        let registry = registry();
        let a = open(&registry);
        let b = open(&registry);
        let prog = channel("programming");
        let news = channel("tech-news-channel");

        let _ = registry.join(a, &prog);
        let _ = registry.join(b, &prog);
        let _ = registry.join(a, &news);
        let _ = registry.join(a, &news);
        assert_mirrored(&registry, &[a, b]);

        let _ = registry.leave(a, &prog);
        let _ = registry.leave(b, &news);
        assert_mirrored(&registry, &[a, b]);

        assert_eq!(registry.directory().members(&prog), vec![b]);
        assert_eq!(registry.directory().members(&news), vec![a]);
    }

    #[test]
    fn unregister_cascades_into_directory() {
        let registry = registry();
        let a = open(&registry);
        let b = open(&registry);
        let prog = channel("programming");
        let _ = registry.join(a, &prog);
        let _ = registry.join(b, &prog);

        let Some(removed) = registry.unregister(a) else {
            panic!("a was registered");
        };
        assert_eq!(removed.state(), ConnectionState::Closed);
        assert!(removed.channels().contains(&prog));
        assert_eq!(registry.directory().members(&prog), vec![b]);
        assert_mirrored(&registry, &[a, b]);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = registry();
        let a = open(&registry);
        assert!(registry.unregister(a).is_some());
        assert!(registry.unregister(a).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn transition_rejects_illegal_event() {
        let registry = registry();
        let id = registry.register(Connection::new(RecordingTransport::new()));
        let result = registry.transition(id, SessionEvent::CloseCompleted);
        assert!(matches!(result, Err(RelayError::IllegalTransition { .. })));
    }

    #[test]
    fn resolve_marks_departed_members() {
        let registry = registry();
        let a = open(&registry);
        let gone = ConnectionId::new();
        let resolved = registry.resolve(&[a, gone]);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().any(|(id, t)| *id == a && t.is_some()));
        assert!(resolved.iter().any(|(id, t)| *id == gone && t.is_none()));
    }
}
