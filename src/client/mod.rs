//! Contracts of the coordination-service collaborator.
//!
//! The cache never talks to the wire itself. It issues watched reads through
//! [`ZkClient`] and consumes connection-state changes through the
//! [`ConnectionStateManager`] owned by a [`ZkFramework`]. Any transport that
//! honours these contracts can back a tree cache:
//!
//! - each read accepts at most one [`Watcher`], which fires at most once;
//! - watchers are kept as a set per path and watch type: registering a
//!   watcher equal to one already armed there is a no-op;
//! - replies are closed unions ([`DataReply`], [`ChildrenReply`],
//!   [`ExistsReply`]) with an explicit success / no-node / failure split;
//! - `mkdirs` is idempotent.

mod reply;
mod watcher;


use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
pub use reply::*;
use tracing::debug;
pub(crate) use watcher::WatchNotification;
pub use watcher::WatchKind;
pub use watcher::WatchedEvent;
pub use watcher::Watcher;

use crate::ConnectionState;
use crate::ConnectionStateListener;
use crate::ConnectionStateManager;
use crate::Error;
use crate::KeeperState;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ZkClient: Send + Sync + 'static {
    /// Reads a node's payload and stat, optionally leaving a data watch
    /// (fires on data change or deletion).
    async fn get_data(
        &self,
        path: &str,
        watcher: Option<Watcher>,
    ) -> DataReply;

    /// Lists a node's children, optionally leaving a child watch (fires on
    /// child-set change or deletion).
    async fn get_children(
        &self,
        path: &str,
        watcher: Option<Watcher>,
    ) -> ChildrenReply;

    /// Checks existence, optionally leaving a watch that also fires on
    /// creation.
    async fn exists(
        &self,
        path: &str,
        watcher: Option<Watcher>,
    ) -> ExistsReply;

    /// Ensures every node along `path` exists. When `make_last_node` is false
    /// only the ancestors are created.
    async fn mkdirs(
        &self,
        path: &str,
        make_last_node: bool,
    ) -> std::result::Result<(), ReturnCode>;

    /// Current raw session state.
    fn state(&self) -> KeeperState;
}

/// A [`ZkClient`] together with the connection-state bookkeeping shared by
/// every cache built on top of it.
pub struct ZkFramework {
    client: Arc<dyn ZkClient>,
    state_manager: ConnectionStateManager,
}

impl std::fmt::Debug for ZkFramework {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ZkFramework")
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

impl ZkFramework {
    pub fn new(client: Arc<dyn ZkClient>) -> Arc<Self> {
        let state_manager = ConnectionStateManager::new(client.clone());
        Arc::new(Self {
            client,
            state_manager,
        })
    }

    pub fn client(&self) -> Arc<dyn ZkClient> {
        self.client.clone()
    }

    pub fn state_manager(&self) -> &ConnectionStateManager {
        &self.state_manager
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state_manager.connection_state()
    }

    pub fn is_connected(&self) -> bool {
        self.state_manager.is_connected()
    }

    pub fn add_connection_state_listener(
        &self,
        listener: Arc<dyn ConnectionStateListener>,
    ) {
        self.state_manager.add_listener(listener);
    }

    pub fn remove_connection_state_listener(
        &self,
        listener: &Arc<dyn ConnectionStateListener>,
    ) {
        self.state_manager.remove_listener(listener);
    }

    /// Entry point for the transport's raw session events.
    pub fn process_state(
        &self,
        raw: KeeperState,
    ) {
        self.state_manager.process(raw);
    }

    /// Makes sure `path` and all of its ancestors exist.
    pub async fn create_containers(
        &self,
        path: &str,
    ) -> Result<()> {
        debug!(path, "create_containers");
        self.client
            .mkdirs(path, true)
            .await
            .map_err(|code| Error::CreateContainers {
                path: path.to_string(),
                code,
            })
    }
}
