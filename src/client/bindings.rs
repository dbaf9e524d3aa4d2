//! Event name → handler table.
//!
//! Handlers for one event run synchronously, in bind order, for every
//! matching frame. Unbinding removes the handler from its list.

use std::collections::HashMap;
use std::fmt;

use crate::domain::ServerFrame;

/// Handle returned by [`EventBindings::bind`], used to unbind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

type Handler = Box<dyn FnMut(&ServerFrame) + Send>;

struct Binding {
    id: BindingId,
    channel: Option<String>,
    handler: Handler,
}

/// Subscription table mapping event names to ordered handler lists.
#[derive(Default)]
pub struct EventBindings {
    next_id: u64,
    table: HashMap<String, Vec<Binding>>,
}

impl fmt::Debug for EventBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBindings")
            .field("events", &self.table.keys().collect::<Vec<_>>())
            .field("bindings", &self.len())
            .finish()
    }
}

impl EventBindings {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for `event`. With `channel` set, the handler only
    /// sees frames published on that channel.
    pub fn bind(
        &mut self,
        event: impl Into<String>,
        channel: Option<String>,
        handler: impl FnMut(&ServerFrame) + Send + 'static,
    ) -> BindingId {
        let id = BindingId(self.next_id);
        self.next_id += 1;
        self.table.entry(event.into()).or_default().push(Binding {
            id,
            channel,
            handler: Box::new(handler),
        });
        id
    }

    /// Removes a handler. Returns `false` if it was not bound.
    pub fn unbind(&mut self, id: BindingId) -> bool {
        let mut removed = false;
        self.table.retain(|_, list| {
            let before = list.len();
            list.retain(|b| b.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Removes every handler filtered to `channel`.
    pub fn unbind_channel(&mut self, channel: &str) {
        self.table.retain(|_, list| {
            list.retain(|b| b.channel.as_deref() != Some(channel));
            !list.is_empty()
        });
    }

    /// Runs the handlers bound to the frame's event. Returns how many ran.
    pub fn dispatch(&mut self, frame: &ServerFrame) -> usize {
        let Some(list) = self.table.get_mut(&frame.event) else {
            return 0;
        };
        let frame_channel = frame.channel.as_ref().map(|c| c.as_str());
        let mut invoked = 0;
        for binding in list.iter_mut() {
            if binding.channel.is_some() && binding.channel.as_deref() != frame_channel {
                continue;
            }
            (binding.handler)(frame);
            invoked += 1;
        }
        invoked
    }

    /// Total number of bound handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::domain::{ChannelId, events};

    fn frame(event: &str, channel: Option<&str>) -> ServerFrame {
        let mut frame = ServerFrame::control(event, serde_json::json!({}));
        if let Some(name) = channel {
            let Ok(id) = ChannelId::parse(name) else {
                panic!("valid channel");
            };
            frame = frame.with_channel(id);
        }
        frame
    }

    #[test]
    fn handlers_run_in_bind_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bindings = EventBindings::new();
        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            bindings.bind(events::MESSAGE_IN, None, move |_| log.lock().push(tag));
        }
        assert_eq!(bindings.dispatch(&frame(events::MESSAGE_IN, Some("programming"))), 3);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unbind_removes_only_that_handler() {
        let hits = Arc::new(Mutex::new(0));
        let mut bindings = EventBindings::new();
        let keep = {
            let hits = Arc::clone(&hits);
            bindings.bind(events::MESSAGE_IN, None, move |_| *hits.lock() += 1)
        };
        let drop_me = bindings.bind(events::MESSAGE_IN, None, |_| {});

        assert!(bindings.unbind(drop_me));
        assert!(!bindings.unbind(drop_me));
        assert_eq!(bindings.len(), 1);
        bindings.dispatch(&frame(events::MESSAGE_IN, None));
        assert_eq!(*hits.lock(), 1);

        assert!(bindings.unbind(keep));
        assert!(bindings.is_empty());
    }

    #[test]
    fn channel_filter_applies() {
        let mut bindings = EventBindings::new();
        bindings.bind(events::MESSAGE_IN, Some("programming".to_string()), |_| {});
        assert_eq!(bindings.dispatch(&frame(events::MESSAGE_IN, Some("programming"))), 1);
        assert_eq!(bindings.dispatch(&frame(events::MESSAGE_IN, Some("dad-jokes-channel"))), 0);
        assert_eq!(bindings.dispatch(&frame(events::SUBSCRIPTION_COUNT, Some("programming"))), 0);
    }

    #[test]
    fn unbind_channel_drops_filtered_handlers() {
        let mut bindings = EventBindings::new();
        bindings.bind(events::MESSAGE_IN, Some("programming".to_string()), |_| {});
        bindings.bind(events::SUBSCRIPTION_COUNT, Some("programming".to_string()), |_| {});
        bindings.bind(events::MESSAGE_IN, None, |_| {});
        bindings.unbind_channel("programming");
        assert_eq!(bindings.len(), 1);
    }
}
