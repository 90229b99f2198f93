//! Connection state tracking.
//!
//! Raw session signals coming from the transport ([`KeeperState`]) are folded
//! into the small [`ConnectionState`] vocabulary the cache reacts to.

mod state_manager;


pub use state_manager::*;

/// Raw session state as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeeperState {
    Disconnected,
    SyncConnected,
    AuthFailed,
    ConnectedReadOnly,
    SaslAuthenticated,
    Expired,
    /// Anything the transport could not classify
    Unknown,
}

impl KeeperState {
    /// States that count as a (re-)established session.
    pub fn is_connect_event(&self) -> bool {
        matches!(self, KeeperState::SyncConnected | KeeperState::SaslAuthenticated)
    }
}

/// State changes in the connection to the coordination service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// First successful connection. Sent once per framework instance.
    Connected,

    /// The connection was lost. Anything depending on the session should
    /// pause until it is re-established.
    Suspended,

    /// A suspended, lost, or read-only connection has been re-established.
    Reconnected,

    /// The session is considered expired (expiry or authentication failure).
    Lost,

    /// The connection is in read-only mode until the next state change.
    ReadOnly,
}

impl ConnectionState {
    /// True if this state implies a live connection to the service.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Reconnected | ConnectionState::ReadOnly
        )
    }
}
