//! Synchronous fan-out of accepted messages to subscribers.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::error;

use crate::lock;
use crate::message::{Message, MessageType};
use crate::types::DeviceId;

type Callback = dyn Fn(&Message) + Send + Sync;

/// Handle returned by [`MessageBus::subscribe`], used to unsubscribe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Selects which messages a subscriber sees. The default matches everything.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    device: Option<DeviceId>,
    kinds: Vec<MessageType>,
}

impl MessageFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Only messages from `device`.
    pub fn device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    /// Only messages of type `kind`. May be given several times.
    pub fn kind(mut self, kind: MessageType) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn matches(&self, msg: &Message) -> bool {
        self.device.map_or(true, |id| msg.device_id() == Some(id))
            && (self.kinds.is_empty() || self.kinds.contains(&msg.kind()))
    }
}

struct Subscriber {
    id: Subscription,
    filter: MessageFilter,
    callback: Arc<Callback>,
}

/// Publish/subscribe hub owned by a [`Dongle`](crate::Dongle).
///
/// Callbacks run on the publishing thread, which for a connected dongle is the
/// read thread; they should hand off long work. A panicking callback is logged
/// and does not affect the other subscribers.
#[derive(Default)]
pub struct MessageBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, filter: MessageFilter, callback: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let id = Subscription(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscribers).push(Subscriber {
            id,
            filter,
            callback: Arc::new(callback),
        });
        id
    }

    /// Returns false if the subscription was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != subscription);
        subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        lock(&self.subscribers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `msg` to every matching subscriber, returning how many were called.
    pub fn publish(&self, msg: &Message) -> usize {
        // Callbacks run without the lock held so they may (un)subscribe.
        let targets: Vec<(Subscription, Arc<Callback>)> = lock(&self.subscribers)
            .iter()
            .filter(|s| s.filter.matches(msg))
            .map(|s| (s.id, Arc::clone(&s.callback)))
            .collect();

        for (id, callback) in &targets {
            if panic::catch_unwind(AssertUnwindSafe(|| (**callback)(msg))).is_err() {
                error!(
                    "Subscriber {:?} panicked while handling {} message '{}'",
                    id,
                    msg.kind(),
                    msg.text()
                );
            }
        }
        targets.len()
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("subscribers", &self.len())
            .finish()
    }
}
