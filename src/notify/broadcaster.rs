// src/notify/broadcaster.rs
//! Synchronous publish/subscribe fan-out of feed events.
//!
//! - Listeners run in subscription order on the publishing task.
//! - A panicking listener is logged and skipped; the rest still run.
//! - With no subscribers an event is simply dropped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::{FeedEvent, QuakeUpdate, UpdateOrigin};
use crate::model::Quake;

pub type Listener = Arc<dyn Fn(&FeedEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Default)]
pub struct UpdateBroadcaster {
    registry: Arc<Registry>,
}

/// Handle returned by [`UpdateBroadcaster::subscribe`].
#[must_use = "dropping the handle keeps the listener registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(reg) = self.registry.upgrade() {
            reg.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl UpdateBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Live update: the full reconciled set plus the records new in this cycle.
    pub fn publish(&self, quakes: &[Quake], new_quakes: &[Quake]) {
        self.publish_event(&FeedEvent::Updated(QuakeUpdate {
            quakes: quakes.to_vec(),
            new_quakes: new_quakes.to_vec(),
            origin: UpdateOrigin::Live,
        }));
    }

    pub fn publish_event(&self, event: &FeedEvent) {
        // snapshot so listeners may (un)subscribe while being called
        let listeners: Vec<Listener> = self.registry.lock().iter().map(|(_, l)| l.clone()).collect();
        for (idx, listener) in listeners.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(target: "notify", listener = idx, "listener panicked while handling feed event");
            }
        }
    }
}
