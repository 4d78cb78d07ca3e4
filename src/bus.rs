//! Publish/subscribe registry for outgoing events
//!
//! Listeners run synchronously, in registration order, inside the
//! `post_event` call that produced the event.

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::events::{OutgoingEvent, OutgoingKind};

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&OutgoingEvent)>;

struct Subscription {
    id: SubscriptionId,
    kind: OutgoingKind,
    listener: Listener,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: OutgoingKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&OutgoingEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            listener: Box::new(listener),
        });
        id
    }

    /// Remove a listener; returns false if it was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn has_listeners(&self, kind: OutgoingKind) -> bool {
        self.subscriptions.iter().any(|s| s.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Deliver `event` to every listener of its kind.
    ///
    /// A panicking listener is logged and skipped; later listeners still run.
    pub fn publish(&mut self, event: &OutgoingEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for sub in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
            let listener = &mut sub.listener;
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(subscription = ?sub.id, ?kind, "listener panicked"),
            }
        }
        delivered
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
