use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use tracing::error;

use super::ConnectionState;
use super::KeeperState;
use crate::ZkClient;

/// Receives translated connection states in the order the transport reported
/// them.
pub trait ConnectionStateListener: Send + Sync + 'static {
    fn state_changed(
        &self,
        state: ConnectionState,
    );
}

impl<F> ConnectionStateListener for F
where
    F: Fn(ConnectionState) + Send + Sync + 'static,
{
    fn state_changed(
        &self,
        state: ConnectionState,
    ) {
        self(state)
    }
}

/// Translates raw session signals and fans them out to listeners.
///
/// The first connect event maps to [`ConnectionState::Connected`]; every later
/// one maps to [`ConnectionState::Reconnected`].
pub struct ConnectionStateManager {
    client: Arc<dyn ZkClient>,
    connect_events: AtomicU64,
    listeners: RwLock<Vec<Arc<dyn ConnectionStateListener>>>,
}

impl std::fmt::Debug for ConnectionStateManager {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConnectionStateManager")
            .field("connect_events", &self.connect_events)
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl ConnectionStateManager {
    pub fn new(client: Arc<dyn ZkClient>) -> Self {
        Self {
            client,
            connect_events: AtomicU64::new(0),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn add_listener(
        &self,
        listener: Arc<dyn ConnectionStateListener>,
    ) {
        self.listeners.write().push(listener);
    }

    /// Removes the first registration of this exact listener. Unknown
    /// listeners are ignored.
    pub fn remove_listener(
        &self,
        listener: &Arc<dyn ConnectionStateListener>,
    ) {
        let mut listeners = self.listeners.write();
        if let Some(i) = listeners.iter().position(|l| same_listener(l, listener)) {
            listeners.remove(i);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Handles one raw state reported by the transport.
    pub fn process(
        &self,
        raw: KeeperState,
    ) {
        if raw.is_connect_event() {
            self.connect_events.fetch_add(1, Ordering::SeqCst);
        }
        let state = self.translate(raw);
        debug!(?raw, ?state, "connection state changed");

        // Snapshot so a listener may (un)register without deadlocking.
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.state_changed(state))).is_err() {
                error!(?state, "connection state listener panicked");
            }
        }
    }

    /// Translated view of the client's current raw state.
    pub fn connection_state(&self) -> ConnectionState {
        self.translate(self.client.state())
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    fn translate(
        &self,
        raw: KeeperState,
    ) -> ConnectionState {
        match raw {
            KeeperState::Disconnected => ConnectionState::Suspended,
            KeeperState::SyncConnected | KeeperState::SaslAuthenticated => {
                if self.connect_events.load(Ordering::SeqCst) > 1 {
                    ConnectionState::Reconnected
                } else {
                    ConnectionState::Connected
                }
            }
            KeeperState::AuthFailed | KeeperState::Expired => ConnectionState::Lost,
            KeeperState::ConnectedReadOnly => ConnectionState::ReadOnly,
            KeeperState::Unknown => ConnectionState::Suspended,
        }
    }
}

/// Identity comparison that ignores vtable pointers.
pub(crate) fn same_listener<T: ?Sized>(
    a: &Arc<T>,
    b: &Arc<T>,
) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
