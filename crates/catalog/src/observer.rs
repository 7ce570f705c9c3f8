//! Minimal observer registry shared by the catalog and the download tracker.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

impl<T> Registry<T> {
    fn remove(&mut self, id: u64) {
        self.callbacks.retain(|(cb_id, _)| *cb_id != id);
    }
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A list of callbacks notified with every committed value.
///
/// Owners number their commits; deliveries are serialized and a value older
/// than the last one delivered is dropped, so the final value every
/// subscriber sees is the latest commit.
pub struct Subscribers<T> {
    registry: Arc<Mutex<Registry<T>>>,
    /// Sequence number of the last delivered value.
    delivered: Mutex<u64>,
}

impl<T: 'static> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: Vec::new(),
            })),
            delivered: Mutex::new(0),
        }
    }

    /// Registers a callback. It stays registered until the returned
    /// [`Subscription`] is dropped or [`unsubscribed`](Subscription::unsubscribe).
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.callbacks.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    lock(&registry).remove(id);
                }
            })),
        }
    }

    /// Calls every registered callback with `value`, the owner's commit
    /// number `seq`. Returns `false` if a later commit was already delivered.
    ///
    /// Callbacks run outside the registry lock, so they may subscribe,
    /// unsubscribe or read the owner. They must not write to the owner.
    pub fn notify(&self, seq: u64, value: &T) -> bool {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        if seq <= *delivered {
            return false;
        }
        *delivered = seq;

        let callbacks: Vec<Callback<T>> = lock(&self.registry)
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(value);
        }
        true
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        lock(&self.registry).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = lock(&self.registry).callbacks.len();
        f.debug_struct("Subscribers").field("count", &count).finish()
    }
}

/// Handle returned by [`Subscribers::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
