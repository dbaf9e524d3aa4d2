//! Channel → member index.
//!
//! [`ChannelDirectory`] maps each occupied channel to the set of connections
//! subscribed to it. Channels are created on first subscribe and evicted
//! when their last member leaves.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use serde::Serialize;

use super::{ChannelId, ConnectionId};

/// Result of a subscribe or unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MembershipChange {
    /// Member count of the channel after the operation.
    pub member_count: usize,
    /// `false` when the operation was a no-op (duplicate subscribe, or
    /// unsubscribe from a channel the connection was not in).
    pub changed: bool,
}

/// Index of channel memberships.
///
/// # Concurrency
///
/// A single mutex guards the whole map. Critical sections are short and
/// never span I/O. [`super::ConnectionRegistry`] calls into the directory
/// while holding its own lock, so the directory must never call back into
/// the registry.
///
/// Mutations should go through the registry's `join`/`leave` so that the
/// connection-side channel set stays mirrored.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    channels: Mutex<HashMap<ChannelId, BTreeSet<ConnectionId>>>,
}

impl ChannelDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connection` to `channel`, creating the channel if needed.
    pub fn subscribe(&self, channel: &ChannelId, connection: ConnectionId) -> MembershipChange {
        let mut map = self.channels.lock();
        let members = map.entry(channel.clone()).or_default();
        let changed = members.insert(connection);
        MembershipChange {
            member_count: members.len(),
            changed,
        }
    }

    /// Removes `connection` from `channel`, evicting the channel once empty.
    ///
    /// Unknown channels and non-members are a no-op.
    pub fn unsubscribe(&self, channel: &ChannelId, connection: ConnectionId) -> MembershipChange {
        let mut map = self.channels.lock();
        let Some(members) = map.get_mut(channel) else {
            return MembershipChange {
                member_count: 0,
                changed: false,
            };
        };
        let changed = members.remove(&connection);
        let member_count = members.len();
        if member_count == 0 {
            map.remove(channel);
        }
        MembershipChange {
            member_count,
            changed,
        }
    }

    /// Returns a snapshot of the members of `channel`.
    ///
    /// The result is detached from the directory: later subscribes and
    /// unsubscribes do not affect it.
    #[must_use]
    pub fn members(&self, channel: &ChannelId) -> Vec<ConnectionId> {
        self.channels
            .lock()
            .get(channel)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the member count of `channel`, zero if unknown.
    #[must_use]
    pub fn member_count(&self, channel: &ChannelId) -> usize {
        self.channels.lock().get(channel).map_or(0, BTreeSet::len)
    }

    /// Returns `true` if `connection` is a member of `channel`.
    #[must_use]
    pub fn is_member(&self, channel: &ChannelId, connection: ConnectionId) -> bool {
        self.channels
            .lock()
            .get(channel)
            .is_some_and(|m| m.contains(&connection))
    }

    /// Lists every occupied channel with its member count, sorted by name.
    #[must_use]
    pub fn channels(&self) -> Vec<(ChannelId, usize)> {
        let mut list: Vec<_> = self
            .channels
            .lock()
            .iter()
            .map(|(id, members)| (id.clone(), members.len()))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn channel(name: &str) -> ChannelId {
        let Ok(id) = ChannelId::parse(name) else {
            panic!("valid channel name");
        };
        id
    }

    #[test]
    fn subscribe_creates_channel_and_counts() {
        let dir = ChannelDirectory::new();
        let ch = channel("programming");
        let first = dir.subscribe(&ch, ConnectionId::new());
        let second = dir.subscribe(&ch, ConnectionId::new());
        assert_eq!(first.member_count, 1);
        assert_eq!(second.member_count, 2);
        assert_eq!(dir.member_count(&ch), 2);
    }

    #[test]
    fn duplicate_subscribe_is_idempotent() {
        let dir = ChannelDirectory::new();
        let ch = channel("programming");
        let conn = ConnectionId::new();
        assert!(dir.subscribe(&ch, conn).changed);
        let again = dir.subscribe(&ch, conn);
        assert!(!again.changed);
        assert_eq!(again.member_count, 1);
    }

    #[test]
    fn unsubscribe_unknown_channel_is_noop() {
        let dir = ChannelDirectory::new();
        let change = dir.unsubscribe(&channel("nowhere"), ConnectionId::new());
        assert!(!change.changed);
        assert_eq!(change.member_count, 0);
    }

    #[test]
    fn last_unsubscribe_evicts_channel() {
        let dir = ChannelDirectory::new();
        let ch = channel("tech-news-channel");
        let conn = ConnectionId::new();
        dir.subscribe(&ch, conn);
        assert_eq!(dir.channels().len(), 1);
        dir.unsubscribe(&ch, conn);
        assert!(dir.channels().is_empty());
        assert_eq!(dir.member_count(&ch), 0);
    }

    #[test]
    fn members_is_a_snapshot() {
        let dir = ChannelDirectory::new();
        let ch = channel("programming");
        let a = ConnectionId::new();
        dir.subscribe(&ch, a);
        let snapshot = dir.members(&ch);
        dir.subscribe(&ch, ConnectionId::new());
        dir.unsubscribe(&ch, a);
        assert_eq!(snapshot, vec![a]);
    }

    #[test]
    fn count_after_k_subscribes_and_j_unsubscribes() {
        let dir = ChannelDirectory::new();
        let ch = channel("programming");
        let conns: Vec<_> = (0..7).map(|_| ConnectionId::new()).collect();
        for c in &conns {
            dir.subscribe(&ch, *c);
        }
        for c in conns.iter().take(3) {
            dir.unsubscribe(&ch, *c);
        }
        assert_eq!(dir.member_count(&ch), 7 - 3);
    }

    #[test]
    fn unknown_channel_has_no_members() {
        let dir = ChannelDirectory::new();
        assert!(dir.members(&channel("nobody-here")).is_empty());
        assert_eq!(dir.member_count(&channel("nobody-here")), 0);
    }
}
