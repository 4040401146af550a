//! Signal hubs with disposable subscriptions
//!
//! Hosts publish navigation and focus signals through a `SignalHub`. Each
//! subscriber receives a `Subscription`; dropping it deregisters the listener.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct HubInner<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
    registrations: u64,
}

/// Multi-listener signal source
pub struct SignalHub<T> {
    inner: Arc<Mutex<HubInner<T>>>,
}

impl<T> Clone for SignalHub<T> {
    fn clone(&self) -> Self {
        SignalHub {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> SignalHub<T> {
    pub fn new() -> Self {
        SignalHub {
            inner: Arc::new(Mutex::new(HubInner {
                next_id: 0,
                listeners: Vec::new(),
                registrations: 0,
            })),
        }
    }

    /// Register a listener. It stays registered until the returned
    /// subscription is dropped or disposed.
    #[must_use = "dropping the subscription deregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.registrations += 1;
            inner.listeners.push((id, Arc::new(listener)));
            id
        };

        let hub: Weak<Mutex<HubInner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(hub) = hub.upgrade() {
                    hub.lock().listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    /// Deliver a signal to every listener; returns how many were notified.
    /// Listeners run outside the hub lock and may (un)subscribe freely.
    pub fn emit(&self, signal: &T) -> usize {
        let listeners: Vec<Listener<T>> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in &listeners {
            listener(signal);
        }
        listeners.len()
    }

    /// Currently registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Registrations made over the hub's lifetime
    pub fn total_registrations(&self) -> u64 {
        self.inner.lock().registrations
    }
}

impl<T: 'static> Default for SignalHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer for a hub registration
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Deregister now
    pub fn dispose(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
