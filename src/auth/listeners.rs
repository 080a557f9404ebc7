//! Auth state change subscriptions

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use log::debug;
use uuid::Uuid;

use super::{AuthChangeEvent, Session};

/// Callback invoked on every auth state change.
///
/// Callbacks run while the registry is read-locked and must not subscribe or
/// unsubscribe from inside the call.
pub type AuthCallback = Box<dyn Fn(AuthChangeEvent, Option<&Session>) + Send + Sync>;

/// Registry of auth state listeners
#[derive(Default)]
pub struct AuthListeners {
    callbacks: RwLock<HashMap<Uuid, AuthCallback>>,
}

impl AuthListeners {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a callback; it stays registered until the returned handle is released
    pub fn subscribe(self: &Arc<Self>, callback: AuthCallback) -> AuthSubscription {
        let id = Uuid::new_v4();
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, callback);
        debug!("Auth listener {} registered", id);

        AuthSubscription {
            id,
            listeners: Arc::downgrade(self),
            active: true,
        }
    }

    /// Deliver a state change to every registered callback
    pub fn emit(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
        debug!(
            "Emitting {:?} to {} auth listener(s)",
            event,
            callbacks.len()
        );
        for callback in callbacks.values() {
            callback(event, session);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: &Uuid) -> bool {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }
}

/// Handle to a registered auth listener.
///
/// The listener is removed exactly once: by [`AuthSubscription::unsubscribe`]
/// or, failing that, when the handle is dropped.
pub struct AuthSubscription {
    id: Uuid,
    listeners: Weak<AuthListeners>,
    active: bool,
}

impl AuthSubscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(listeners) = self.listeners.upgrade() {
            if listeners.remove(&self.id) {
                debug!("Auth listener {} removed", self.id);
            }
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> AuthCallback {
        let counter = Arc::clone(counter);
        Box::new(move |_: AuthChangeEvent, _: Option<&Session>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let listeners = AuthListeners::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let subscription = listeners.subscribe(counting(&calls));
        listeners.emit(AuthChangeEvent::SignedOut, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        assert!(listeners.is_empty());
        listeners.emit(AuthChangeEvent::SignedOut, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_handle_releases_only_its_listener() {
        let listeners = AuthListeners::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let kept = listeners.subscribe(counting(&calls));
        {
            let _dropped = listeners.subscribe(counting(&calls));
            assert_eq!(listeners.len(), 2);
        }
        assert_eq!(listeners.len(), 1);

        listeners.emit(AuthChangeEvent::SignedIn, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(kept.is_active());
    }

    #[test]
    fn handle_outliving_registry_is_harmless() {
        let listeners = AuthListeners::new();
        let subscription = listeners.subscribe(Box::new(|_: AuthChangeEvent, _: Option<&Session>| {}));
        drop(listeners);
        subscription.unsubscribe();
    }
}
