//! Typed change notification with explicit unsubscription.
//!
//! An [`Emitter`] delivers each event synchronously to every listener in
//! subscription order. Subscribing returns a [`Subscription`] token; dropping
//! the token (or calling [`Subscription::unsubscribe`]) removes the listener.
//! A panicking listener is logged and skipped, and the remaining listeners
//! still run.

use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// Fan-out of `T` events to registered listeners.
pub struct Emitter<T> {
    name: &'static str,
    listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("name", &self.name)
            .field("listeners", &self.listeners.lock().entries.len())
            .finish()
    }
}

impl<T: 'static> Emitter<T> {
    /// Create an emitter; `name` only appears in log output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener. It stays registered while the returned token lives.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut listeners = self.listeners.lock();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::new(callback)));
            id
        };
        trace!("{}: listener {} subscribed", self.name, id);

        let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.listeners);
        let name = self.name;
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(listeners) = weak.upgrade() {
                    listeners.lock().entries.retain(|(entry, _)| *entry != id);
                    trace!("{}: listener {} unsubscribed", name, id);
                }
            })),
        }
    }

    /// Register a listener that forwards clones of every event to a channel.
    pub fn channel(&self) -> (Subscription, flume::Receiver<T>)
    where
        T: Clone + Send,
    {
        let (tx, rx) = flume::unbounded();
        let subscription = self.subscribe(move |event: &T| {
            // A closed receiver just means nobody is reading anymore.
            let _ = tx.send(event.clone());
        });
        (subscription, rx)
    }

    /// Deliver an event to every listener. Returns how many completed normally.
    ///
    /// Listeners may subscribe or unsubscribe from inside a callback; such
    /// changes take effect from the next emission.
    pub fn emit(&self, event: &T) -> usize {
        let snapshot: Vec<(u64, Listener<T>)> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(_) => warn!("{}: listener {} panicked; skipping it", self.name, id),
            }
        }
        delivered
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }
}

/// Token that keeps a listener registered.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Keep the listener registered for the emitter's whole lifetime.
    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
