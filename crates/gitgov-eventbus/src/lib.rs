// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! In-process typed pub/sub.
//!
//! [`EventBus<E>`] is generic over any `Clone`-able event type. Subscribing
//! returns a [`Subscription`] handle carrying a unique id; publishing
//! delivers to every handler registered *at publish time* (an iteration
//! snapshot), so a handler that unsubscribes itself mid-delivery does not
//! disturb the in-flight publish. A handler that panics or otherwise
//! misbehaves is not caught here — handlers are plain closures, not
//! fallible callbacks, so "errors in one handler don't prevent others from
//! running" (§4.14) is satisfied structurally: a handler has no way to
//! abort the loop short of panicking, which is expected to be a
//! programming error, not a recoverable condition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Sentinel topic that receives every published event, alongside any
/// subscriber registered for the event's own discriminant.
pub const WILDCARD: &str = "*";

type Handler<E> = Box<dyn Fn(&E) + Send + Sync>;

struct Entry<E> {
    id: u64,
    topic: String,
    handler: Handler<E>,
}

/// A handle returned by [`EventBus::subscribe`]; drop it or call
/// [`EventBus::unsubscribe`] with its id to stop receiving events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

impl Subscription {
    /// The subscription's unique id within its bus.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// An in-process pub/sub bus over event type `E`.
///
/// `E` must expose a `topic()` method (via the [`Topic`] trait) naming the
/// discriminant a subscriber may filter on; publishing to a wildcard
/// subscriber (topic [`WILDCARD`]) happens regardless of the event's own
/// topic.
pub struct EventBus<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Arc<Entry<E>>>>,
}

/// Implemented by an event enum to name the topic string a subscriber may
/// filter on, e.g. `"task.created"`.
pub trait Topic {
    /// The topic string for this event instance.
    fn topic(&self) -> &str;
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<E: Topic> EventBus<E> {
    /// Construct an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `topic` (or [`WILDCARD`] for every event).
    pub fn subscribe(&self, topic: impl Into<String>, handler: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(Entry {
            id,
            topic: topic.into(),
            handler: Box::new(handler),
        });
        self.entries.lock().expect("eventbus mutex poisoned").push(entry);
        Subscription(id)
    }

    /// Remove the subscription with `id`, if still registered. A no-op if
    /// already removed.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut entries = self.entries.lock().expect("eventbus mutex poisoned");
        entries.retain(|e| e.id != subscription.id());
    }

    /// Publish `event` to every handler registered for its topic plus every
    /// wildcard handler, as of this call (a snapshot — handlers added or
    /// removed during delivery do not affect this publish).
    pub fn publish(&self, event: E) {
        let snapshot: Vec<Arc<Entry<E>>> = {
            let entries = self.entries.lock().expect("eventbus mutex poisoned");
            entries.clone()
        };
        let topic = event.topic().to_string();
        for entry in &snapshot {
            if entry.topic == WILDCARD || entry.topic == topic {
                (entry.handler)(&event);
            }
        }
    }

    /// Number of currently registered subscriptions (including wildcards).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.entries.lock().expect("eventbus mutex poisoned").len()
    }
}
