//! Listener registries and fault-isolated dispatch.


use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;

use crate::connection::same_listener;
use crate::metrics::EVENTS_PUBLISHED;
use crate::metrics::LISTENER_ERRORS;
use crate::Error;
use crate::Result;
use crate::TreeCacheEvent;

/// Receives tree change notifications.
///
/// Calls are made from the cache task, one event at a time, in the order the
/// changes were observed. Returning an error does not stop delivery to other
/// listeners; it is reported to the error listeners instead.
pub trait TreeCacheListener: Send + Sync + 'static {
    fn on_event(
        &self,
        event: &TreeCacheEvent,
    ) -> Result<()>;
}

impl<F> TreeCacheListener for F
where
    F: Fn(&TreeCacheEvent) -> Result<()> + Send + Sync + 'static,
{
    fn on_event(
        &self,
        event: &TreeCacheEvent,
    ) -> Result<()> {
        self(event)
    }
}

/// Receives failures that happened on the cache task.
pub trait UnhandledErrorListener: Send + Sync + 'static {
    fn on_error(
        &self,
        message: &str,
        error: &Error,
    );
}

impl<F> UnhandledErrorListener for F
where
    F: Fn(&str, &Error) + Send + Sync + 'static,
{
    fn on_error(
        &self,
        message: &str,
        error: &Error,
    ) {
        self(message, error)
    }
}

/// Ordered registry of shared listeners. Removal is by `Arc` identity.
pub(crate) struct ListenerContainer<T: ?Sized> {
    listeners: RwLock<Vec<Arc<T>>>,
}

impl<T: ?Sized> Default for ListenerContainer<T> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for ListenerContainer<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ListenerContainer")
            .field("len", &self.len())
            .finish()
    }
}

impl<T: ?Sized> ListenerContainer<T> {
    pub fn add(
        &self,
        listener: Arc<T>,
    ) {
        self.listeners.write().push(listener);
    }

    /// Returns false when the listener was not registered.
    pub fn remove(
        &self,
        listener: &Arc<T>,
    ) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|l| same_listener(l, listener)) {
            Some(i) => {
                listeners.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Copy of the current registrations. Dispatch iterates the copy so a
    /// listener may (un)register from inside a callback.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.listeners.read().clone()
    }
}

/// The change and error listeners of one cache instance.
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    pub(crate) change: ListenerContainer<dyn TreeCacheListener>,
    pub(crate) error: ListenerContainer<dyn UnhandledErrorListener>,
}

impl Listeners {
    /// Delivers `event` to every change listener in registration order.
    pub fn publish(
        &self,
        event: &TreeCacheEvent,
    ) {
        EVENTS_PUBLISHED
            .with_label_values(&[event.event_type().as_str()])
            .inc();

        for listener in self.change.snapshot() {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => Error::Listener(e.to_string()),
                Err(payload) => Error::ListenerPanic(panic_message(payload.as_ref())),
            };
            LISTENER_ERRORS.inc();
            self.handle_exception("Listener failed while handling event", &failure);
        }
    }

    /// Routes a failure to the error listeners, or logs it when there are none.
    pub fn handle_exception(
        &self,
        message: &str,
        error: &Error,
    ) {
        let listeners = self.error.snapshot();
        if listeners.is_empty() {
            error!(%error, "{}", message);
            return;
        }
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.on_error(message, error))).is_err() {
                error!(%error, "error listener panicked while handling: {}", message);
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
