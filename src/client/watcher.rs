use std::hash::Hash;
use std::hash::Hasher;

use tokio::sync::mpsc;
use tracing::trace;

use crate::NodeId;
use crate::OpKind;

/// Kind of change a one-shot watch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    NodeChildrenChanged,
}

/// Notification delivered by the server for exactly the path a watch was
/// armed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEvent {
    pub kind: WatchKind,
    pub path: String,
}

impl WatchedEvent {
    pub fn new(
        kind: WatchKind,
        path: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// A fired watch, addressed to the tree node that armed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WatchNotification {
    pub node: NodeId,
    pub event: WatchedEvent,
}

/// One-shot watch registration handed to the transport with a watched read.
///
/// `fire` consumes the watcher, so a registration can report at most once;
/// the cache re-arms by issuing a new read.
///
/// Two watchers are equal when they were armed by the same tree node for the
/// same kind of read. A transport keeps a set of watchers per path, so
/// re-arming an already armed watch (as happens on every reconnection)
/// does not add a registration.
#[derive(Debug)]
pub struct Watcher {
    node: NodeId,
    kind: OpKind,
    tx: mpsc::UnboundedSender<WatchNotification>,
}

impl PartialEq for Watcher {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.node == other.node && self.kind == other.kind
    }
}

impl Eq for Watcher {}

impl Hash for Watcher {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.node.hash(state);
        self.kind.hash(state);
    }
}

impl Watcher {
    pub(crate) fn new(
        node: NodeId,
        kind: OpKind,
        tx: mpsc::UnboundedSender<WatchNotification>,
    ) -> Self {
        Self { node, kind, tx }
    }

    /// Delivers the notification. Returns false once the cache that armed the
    /// watch is gone.
    pub fn fire(
        self,
        event: WatchedEvent,
    ) -> bool {
        trace!(node = ?self.node, ?event, "watch fired");
        self.tx
            .send(WatchNotification {
                node: self.node,
                event,
            })
            .is_ok()
    }

    /// True when the receiving cache has shut down and firing is pointless.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
