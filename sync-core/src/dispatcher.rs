//! Event fan-out for one connection.
//!
//! The dispatcher owns the list of registered callbacks and delivers every
//! event to each of them, synchronously and in registration order. It keeps
//! no history: an event dispatched with no subscribers is simply dropped.
//!
//! Each dispatch pass works on a snapshot of the callback list taken before
//! the first callback runs. A callback that unregisters (or registers another
//! one) mid-pass therefore changes the list for the *next* pass only.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<E> = Arc<Mutex<dyn FnMut(&E) + Send>>;

/// Handle identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Registry<E> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Registry<E> {
    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(registered, _)| *registered != id);
        self.callbacks.len() != before
    }
}

/// Fan-out hub delivering events to registered callbacks.
///
/// Cloning yields another handle to the same callback list.
pub struct Dispatcher<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E> Dispatcher<E> {
    /// Create a dispatcher with no subscribers.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Register a callback.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unregister`] is called.
    pub fn register<F>(&self, callback: F) -> Subscription<E>
    where
        F: FnMut(&E) + Send + 'static,
    {
        let mut registry = self.lock();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry
            .callbacks
            .push((id, Arc::new(Mutex::new(callback)) as Callback<E>));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Remove a registration by id. Returns whether it was still registered.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        self.lock().remove(id)
    }

    /// Deliver `event` to every callback registered when the pass starts.
    ///
    /// Returns how many callbacks were invoked. Callbacks must not dispatch
    /// re-entrantly into the same dispatcher.
    pub fn dispatch(&self, event: &E) -> usize {
        let pass: Vec<Callback<E>> = self
            .lock()
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &pass {
            let mut callback = callback.lock().unwrap_or_else(PoisonError::into_inner);
            (&mut *callback)(event);
        }
        pass.len()
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.lock().callbacks.len()
    }

    /// Whether no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry<E>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// A live registration. Dropping it unregisters the callback.
#[must_use = "dropping a Subscription unregisters its callback immediately"]
pub struct Subscription<E> {
    id: SubscriptionId,
    registry: Weak<Mutex<Registry<E>>>,
}

impl<E> Subscription<E> {
    /// Id of this registration.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .callbacks
                .iter()
                .any(|(id, _)| *id == self.id)
        })
    }

    /// Unregister now.
    pub fn unregister(self) {
        drop(self);
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(self.id);
        }
    }
}

impl<E> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
