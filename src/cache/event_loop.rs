use std::collections::HashMap;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesOrdered;
use futures::FutureExt;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::client::WatchNotification;
use crate::listener::panic_message;
use crate::listener::Listeners;
use crate::ChildData;
use crate::ConnectionState;
use crate::ConnectionStateListener;
use crate::Error;
use crate::NodeId;
use crate::OpKind;
use crate::OpReply;
use crate::Operation;
use crate::Outcome;
use crate::Result;
use crate::TreeController;
use crate::TreeState;
use crate::Watcher;
use crate::ZkFramework;

/// Requests from a [`crate::TreeCache`] handle to its task.
pub(crate) enum Command {
    Start(oneshot::Sender<Result<()>>),
    Close(oneshot::Sender<()>),
    CurrentData {
        path: String,
        respond_to: oneshot::Sender<Option<ChildData>>,
    },
    CurrentChildren {
        path: String,
        respond_to: oneshot::Sender<Option<HashMap<String, ChildData>>>,
    },
}

type InFlight = BoxFuture<'static, (NodeId, OpReply)>;

/// The task owning a cache's tree.
///
/// Every input (command, watch fire, connection change, reply) is applied to
/// the controller one at a time. Operations and outcomes the controller queued
/// are flushed after each input.
pub(crate) struct CacheLoop {
    controller: TreeController,
    framework: Arc<ZkFramework>,
    create_parent_nodes: bool,
    listeners: Arc<Listeners>,
    connection_listener: Arc<dyn ConnectionStateListener>,

    cmd_rx: mpsc::Receiver<Command>,
    watch_tx: mpsc::UnboundedSender<WatchNotification>,
    watch_rx: mpsc::UnboundedReceiver<WatchNotification>,
    state_rx: mpsc::UnboundedReceiver<ConnectionState>,
    shutdown_signal: watch::Receiver<()>,

    // Polled in issue order so replies are applied in the session's FIFO order.
    in_flight: FuturesOrdered<InFlight>,
}

impl CacheLoop {
    pub(crate) fn new(
        controller: TreeController,
        framework: Arc<ZkFramework>,
        create_parent_nodes: bool,
        listeners: Arc<Listeners>,
        cmd_rx: mpsc::Receiver<Command>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        let (watch_tx, watch_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = mpsc::unbounded_channel();
        let connection_listener: Arc<dyn ConnectionStateListener> =
            Arc::new(move |state: ConnectionState| {
                let _ = state_tx.send(state);
            });

        Self {
            controller,
            framework,
            create_parent_nodes,
            listeners,
            connection_listener,
            cmd_rx,
            watch_tx,
            watch_rx,
            state_rx,
            shutdown_signal,
            in_flight: FuturesOrdered::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(path = self.controller.root_path(), "tree cache task running");

        loop {
            tokio::select! {
                biased;
                // P0: shutdown received
                _ = self.shutdown_signal.changed() => {
                    debug!(path = self.controller.root_path(), "shutdown signal received");
                    self.close();
                    return;
                }

                // P1: handle requests
                command = self.cmd_rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            debug!("tree cache handle dropped");
                            self.close();
                            return;
                        }
                    }
                }

                // P2: fired watches
                Some(notification) = self.watch_rx.recv() => {
                    trace!(?notification, "receive watch");
                    self.guarded("watch event", |c| c.on_watch(notification.node, notification.event));
                }

                // P3: connection state changes
                Some(state) = self.state_rx.recv() => {
                    trace!(?state, "receive connection state");
                    self.guarded("connection state change", |c| c.on_connection_state(state));
                }

                // P4: completed reads
                Some((node, reply)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    trace!(?node, ?reply, "receive reply");
                    self.guarded("operation reply", |c| c.on_reply(node, reply));
                }
            }

            self.flush();

            if self.controller.state() == TreeState::Closed && self.in_flight.is_empty() {
                debug!(path = self.controller.root_path(), "tree cache task stopped");
                return;
            }
        }
    }

    async fn handle_command(
        &mut self,
        command: Command,
    ) {
        match command {
            Command::Start(respond_to) => {
                let result = self.start().await;
                let _ = respond_to.send(result);
            }
            Command::Close(respond_to) => {
                self.close();
                let _ = respond_to.send(());
            }
            Command::CurrentData { path, respond_to } => {
                let _ = respond_to.send(self.controller.current_data(&path));
            }
            Command::CurrentChildren { path, respond_to } => {
                let _ = respond_to.send(self.controller.current_children(&path));
            }
        }
    }

    async fn start(&mut self) -> Result<()> {
        self.controller.check_startable()?;
        if self.create_parent_nodes {
            self.framework
                .create_containers(self.controller.root_path())
                .await?;
        }
        self.framework
            .add_connection_state_listener(self.connection_listener.clone());
        let connected = self.framework.is_connected();
        // A panic here comes after the controller moved to STARTED.
        self.guarded("start", |c| c.start(connected)).unwrap_or(Ok(()))
    }

    fn close(&mut self) {
        if self.controller.close() {
            self.framework
                .remove_connection_state_listener(&self.connection_listener);
            self.listeners.change.clear();
        }
    }

    /// Applies one input to the controller. A panic raised by user code on the
    /// way (selector predicates) is reported instead of unwinding the task;
    /// whatever the transition queued before panicking is still flushed.
    fn guarded<T>(
        &mut self,
        input: &'static str,
        apply: impl FnOnce(&mut TreeController) -> T,
    ) -> Option<T> {
        let controller = &mut self.controller;
        match catch_unwind(AssertUnwindSafe(|| apply(controller))) {
            Ok(value) => Some(value),
            Err(payload) => {
                let error = Error::HandlerPanic {
                    input,
                    message: panic_message(payload.as_ref()),
                };
                warn!(%error, "recovered from panic in tree cache task");
                self.listeners
                    .handle_exception("Unhandled failure in tree cache task", &error);
                None
            }
        }
    }

    /// Issues queued operations, then dispatches queued outcomes in order.
    fn flush(&mut self) {
        for op in self.controller.take_operations() {
            self.issue(op);
        }
        for outcome in self.controller.take_outcomes() {
            match outcome {
                Outcome::Event(event) => self.listeners.publish(&event),
                Outcome::Failure { message, error } => self.listeners.handle_exception(&message, &error),
            }
        }
    }

    fn issue(
        &mut self,
        op: Operation,
    ) {
        let Operation { kind, node, path } = op;
        let client = self.framework.client();
        let watcher = Watcher::new(node, kind, self.watch_tx.clone());

        let read = async move {
            let reply = match kind {
                OpKind::GetData => OpReply::Data(client.get_data(&path, Some(watcher)).await),
                OpKind::GetChildren => OpReply::Children(client.get_children(&path, Some(watcher)).await),
                OpKind::Exists => OpReply::Exists(client.exists(&path, Some(watcher)).await),
            };
            (node, reply)
        };
        self.in_flight.push_back(read.boxed());
    }
}
