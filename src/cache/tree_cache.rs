use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tracing::debug;

use super::event_loop::CacheLoop;
use super::event_loop::Command;
use crate::listener::Listeners;
use crate::ChildData;
use crate::Error;
use crate::Result;
use crate::TreeCacheBuilder;
use crate::TreeCacheConfig;
use crate::TreeCacheListener;
use crate::TreeCacheSelector;
use crate::TreeController;
use crate::UnhandledErrorListener;
use crate::ZkFramework;

/// A live local mirror of a znode subtree.
///
/// The tree is owned by a background task spawned on the first
/// [`start`](Self::start); the handle talks to it through a command channel.
/// Dropping the handle stops the task.
///
/// ```ignore
/// let cache = TreeCache::builder(framework, "/services").max_depth(2).build()?;
/// cache.add_listener(Arc::new(|event: &TreeCacheEvent| -> Result<()> {
///     println!("{event}");
///     Ok(())
/// }));
/// cache.start().await?;
/// ```
pub struct TreeCache {
    path: String,
    listeners: Arc<Listeners>,
    cmd_tx: mpsc::Sender<Command>,
    /// Task not spawned yet
    pending: Mutex<Option<CacheLoop>>,
    shutdown_tx: watch::Sender<()>,
}

impl std::fmt::Debug for TreeCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TreeCache")
            .field("path", &self.path)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl TreeCache {
    pub fn builder(
        framework: Arc<ZkFramework>,
        path: impl Into<String>,
    ) -> TreeCacheBuilder {
        TreeCacheBuilder::new(framework, path)
    }

    pub(crate) fn new(
        framework: Arc<ZkFramework>,
        config: TreeCacheConfig,
        selector: Arc<dyn TreeCacheSelector>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer_size);
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let listeners = Arc::new(Listeners::default());

        let controller = TreeController::new(
            config.path.clone(),
            config.cache_data,
            config.max_depth(),
            selector,
        );
        let cache_loop = CacheLoop::new(
            controller,
            framework,
            config.create_parent_nodes,
            listeners.clone(),
            cmd_rx,
            shutdown_rx,
        );

        Self {
            path: config.path,
            listeners,
            cmd_tx,
            pending: Mutex::new(Some(cache_loop)),
            shutdown_tx,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Starts the cache. Resolves once the initial reads are scheduled;
    /// [`crate::TreeCacheEventType::Initialized`] reports when they are done.
    ///
    /// # Errors
    /// - [`Error::AlreadyStarted`] / [`Error::Closed`] on a second start
    /// - [`Error::CreateContainers`] when parent creation was requested and failed
    pub async fn start(&self) -> Result<()> {
        let pending = self.pending.lock().take();
        if let Some(cache_loop) = pending {
            debug!(path = %self.path, "spawning tree cache task");
            tokio::spawn(cache_loop.run());
        }
        self.request(Command::Start).await.unwrap_or(Err(Error::Closed))
    }

    /// Stops watching. No event is delivered afterwards and the change
    /// listeners are dropped. Does nothing unless the cache is started.
    pub async fn close(&self) {
        if self.is_latent() {
            return;
        }
        self.request(Command::Close).await;
    }

    /// Data of the node at `full_path`, or `None` when it is not cached or not
    /// live.
    pub async fn get_current_data(
        &self,
        full_path: &str,
    ) -> Option<ChildData> {
        if self.is_latent() {
            return None;
        }
        self.request(|respond_to| Command::CurrentData {
            path: full_path.to_string(),
            respond_to,
        })
        .await
        .flatten()
    }

    /// Live children of the node at `full_path` keyed by name, or `None` when
    /// that node is not cached or not live.
    pub async fn get_current_children(
        &self,
        full_path: &str,
    ) -> Option<HashMap<String, ChildData>> {
        if self.is_latent() {
            return None;
        }
        self.request(|respond_to| Command::CurrentChildren {
            path: full_path.to_string(),
            respond_to,
        })
        .await
        .flatten()
    }

    pub fn add_listener(
        &self,
        listener: Arc<dyn TreeCacheListener>,
    ) -> &Self {
        self.listeners.change.add(listener);
        self
    }

    pub fn remove_listener(
        &self,
        listener: &Arc<dyn TreeCacheListener>,
    ) -> &Self {
        self.listeners.change.remove(listener);
        self
    }

    pub fn add_error_listener(
        &self,
        listener: Arc<dyn UnhandledErrorListener>,
    ) -> &Self {
        self.listeners.error.add(listener);
        self
    }

    pub fn remove_error_listener(
        &self,
        listener: &Arc<dyn UnhandledErrorListener>,
    ) -> &Self {
        self.listeners.error.remove(listener);
        self
    }

    fn is_latent(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Round trip to the task. `None` once the task has stopped.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Option<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(command(tx)).await.ok()?;
        rx.await.ok()
    }
}

impl Drop for TreeCache {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}
