//! Fan-out registry delivering every decoded push message to many consumers.
//!
//! Callbacks are stored in a `DashMap` keyed by a monotonically increasing
//! subscription id. `publish` clones the callback handles out of the map
//! before invoking them, so a callback may subscribe or unsubscribe without
//! deadlocking the registry.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use crate::sample::LiveDataResponse;

type Callback<M> = Arc<dyn Fn(&M) + Send + Sync>;

/// Identifier of one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Observer list with synchronous dispatch.
pub struct FanoutRegistry<M = LiveDataResponse> {
    next_id: AtomicU64,
    subscribers: DashMap<u64, Callback<M>>,
}

impl<M> Default for FanoutRegistry<M> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: DashMap::new(),
        }
    }
}

impl<M: 'static> FanoutRegistry<M> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a callback invoked once per published message.
    ///
    /// The returned handle unsubscribes when dropped. Messages published
    /// before this call are never replayed.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription<M>
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, Arc::new(callback));
        debug!(subscription = id, total = self.subscribers.len(), "Subscriber added");

        Subscription {
            id: SubscriptionId(id),
            registry: Arc::downgrade(self),
        }
    }

    /// Removes a callback. Returns false when the id was not registered,
    /// which is not an error.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.remove(&id.0).is_some();
        if removed {
            debug!(subscription = id.0, total = self.subscribers.len(), "Subscriber removed");
        }
        removed
    }

    /// Delivers a message to every current subscriber and returns how many
    /// were invoked. Delivery completes before this call returns.
    pub fn publish(&self, message: &M) -> usize {
        let callbacks: Vec<Callback<M>> = self
            .subscribers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for callback in &callbacks {
            callback(message);
        }

        trace!(delivered = callbacks.len(), "Message published");
        callbacks.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.contains_key(&id.0)
    }
}

/// RAII handle of one subscription.
///
/// Holds only a weak reference so an outstanding handle never keeps the
/// registry alive.
pub struct Subscription<M = LiveDataResponse> {
    id: SubscriptionId,
    registry: Weak<FanoutRegistry<M>>,
}

impl<M: 'static> Subscription<M> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// True while the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.is_subscribed(self.id))
    }

    /// Unsubscribes now. Calling it again, or dropping the handle afterwards,
    /// is a no-op.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.unsubscribe(self.id),
            None => false,
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.subscribers.remove(&self.id.0);
        }
    }
}

impl<M> fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let registry: Arc<FanoutRegistry<u32>> = FanoutRegistry::new();
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));

        let sink_a = Arc::clone(&a);
        let _sub_a = registry.subscribe(move |m: &u32| sink_a.lock().unwrap().push(*m));
        let sink_b = Arc::clone(&b);
        let _sub_b = registry.subscribe(move |m: &u32| sink_b.lock().unwrap().push(*m));

        for m in 1..=3 {
            assert_eq!(registry.publish(&m), 2);
        }

        assert_eq!(*a.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(*b.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry: Arc<FanoutRegistry<u32>> = FanoutRegistry::new();
        let sub = registry.subscribe(|_| {});
        let id = sub.id();

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(!sub.unsubscribe());
        assert!(!registry.unsubscribe(SubscriptionId(999)));
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry: Arc<FanoutRegistry<u32>> = FanoutRegistry::new();
        let sub = registry.subscribe(|_| {});
        assert_eq!(registry.subscriber_count(), 1);
        drop(sub);
        assert_eq!(registry.subscriber_count(), 0);
        assert_eq!(registry.publish(&1), 0);
    }

    #[test]
    fn test_late_subscriber_gets_no_replay() {
        let registry: Arc<FanoutRegistry<u32>> = FanoutRegistry::new();
        registry.publish(&1);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = registry.subscribe(move |m: &u32| sink.lock().unwrap().push(*m));
        registry.publish(&2);

        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let registry: Arc<FanoutRegistry<u32>> = FanoutRegistry::new();
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&registry);
        let own_id = Arc::clone(&slot);
        let sub = registry.subscribe(move |_| {
            if let (Some(reg), Some(id)) = (weak.upgrade(), *own_id.lock().unwrap()) {
                reg.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(sub.id());

        assert_eq!(registry.publish(&1), 1);
        assert_eq!(registry.publish(&2), 0);
    }

    #[test]
    fn test_handle_outliving_registry() {
        let registry: Arc<FanoutRegistry<u32>> = FanoutRegistry::new();
        let sub = registry.subscribe(|_| {});
        drop(registry);
        assert!(!sub.unsubscribe());
    }
}
