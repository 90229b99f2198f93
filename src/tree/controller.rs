//! Tree-level coordination.
//!
//! [`TreeController`] owns every node of one cache and applies server replies,
//! watch fires and connection changes to them. It never performs I/O: each
//! transition queues [`Operation`]s for the caller to execute and
//! [`Outcome`]s for the caller to dispatch once the transition returns.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::NodeId;
use super::NodeState;
use super::TreeNode;
use crate::metrics::OUTSTANDING_OPS;
use crate::metrics::RPC_FAILURES;
use crate::path;
use crate::ChildData;
use crate::ChildrenReply;
use crate::ConnectionState;
use crate::DataReply;
use crate::Error;
use crate::ExistsReply;
use crate::Result;
use crate::ReturnCode;
use crate::TreeCacheEvent;
use crate::TreeCacheEventType;
use crate::TreeCacheSelector;
use crate::WatchKind;
use crate::WatchedEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TreeState {
    Latent,
    Started,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum OpKind {
    GetData,
    GetChildren,
    Exists,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::GetData => "get_data",
            OpKind::GetChildren => "get_children",
            OpKind::Exists => "exists",
        }
    }
}

/// A watched read the controller wants issued for `node`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Operation {
    pub kind: OpKind,
    pub node: NodeId,
    pub path: String,
}

/// Terminal reply of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OpReply {
    Data(DataReply),
    Children(ChildrenReply),
    Exists(ExistsReply),
}

/// Something decided during a transition that must reach the listeners.
#[derive(Debug)]
pub(crate) enum Outcome {
    Event(TreeCacheEvent),
    Failure { message: String, error: Error },
}

pub(crate) struct TreeController {
    root_path: String,
    root: NodeId,
    nodes: HashMap<NodeId, TreeNode>,
    next_id: u64,

    cache_data: bool,
    max_depth: usize,
    selector: Arc<dyn TreeCacheSelector>,

    state: TreeState,
    outstanding_ops: usize,
    is_initialized: bool,

    operations: Vec<Operation>,
    outcomes: Vec<Outcome>,
}

impl std::fmt::Debug for TreeController {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TreeController")
            .field("root_path", &self.root_path)
            .field("nodes", &self.nodes.len())
            .field("state", &self.state)
            .field("outstanding_ops", &self.outstanding_ops)
            .field("is_initialized", &self.is_initialized)
            .finish()
    }
}

impl TreeController {
    pub fn new(
        root_path: String,
        cache_data: bool,
        max_depth: usize,
        selector: Arc<dyn TreeCacheSelector>,
    ) -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, TreeNode::new(root_path.clone(), None, 0));
        Self {
            root_path,
            root,
            nodes,
            next_id: 1,
            cache_data,
            max_depth,
            selector,
            state: TreeState::Latent,
            outstanding_ops: 0,
            is_initialized: false,
            operations: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn state(&self) -> TreeState {
        self.state
    }

    #[cfg(test)]
    pub fn outstanding_ops(&self) -> usize {
        self.outstanding_ops
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    #[cfg(test)]
    pub fn node(
        &self,
        id: NodeId,
    ) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn take_operations(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.operations)
    }

    pub fn take_outcomes(&mut self) -> Vec<Outcome> {
        std::mem::take(&mut self.outcomes)
    }

    // ---- lifecycle ----

    pub fn check_startable(&self) -> Result<()> {
        match self.state {
            TreeState::Latent => Ok(()),
            TreeState::Started => Err(Error::AlreadyStarted),
            TreeState::Closed => Err(Error::Closed),
        }
    }

    /// LATENT -> STARTED. The root is read right away when `connected`,
    /// otherwise on the first CONNECTED state.
    pub fn start(
        &mut self,
        connected: bool,
    ) -> Result<()> {
        self.check_startable()?;
        self.state = TreeState::Started;
        debug!(path = %self.root_path, connected, "tree cache started");
        if connected {
            self.was_created(self.root);
        }
        Ok(())
    }

    /// STARTED -> CLOSED. Returns false when the tree was not started.
    pub fn close(&mut self) -> bool {
        if self.state != TreeState::Started {
            return false;
        }
        self.state = TreeState::Closed;
        debug!(path = %self.root_path, "tree cache closed");
        self.was_deleted(self.root);
        true
    }

    // ---- lookups ----

    /// Resolves a full path to the node mirroring it.
    pub fn find(
        &self,
        full_path: &str,
    ) -> Option<NodeId> {
        let root_segments = path::split(&self.root_path).ok()?;
        let target = path::split(full_path).ok()?;
        if target.len() < root_segments.len() || target[..root_segments.len()] != root_segments[..] {
            return None;
        }

        let mut current = self.root;
        for segment in &target[root_segments.len()..] {
            let node = self.nodes.get(&current)?;
            current = *node.children.as_ref()?.get(*segment)?;
        }
        Some(current)
    }

    pub fn current_data(
        &self,
        full_path: &str,
    ) -> Option<ChildData> {
        let node = self.nodes.get(&self.find(full_path)?)?;
        if !node.is_live() {
            return None;
        }
        node.data.clone()
    }

    /// LIVE children of a LIVE node, keyed by node name.
    pub fn current_children(
        &self,
        full_path: &str,
    ) -> Option<HashMap<String, ChildData>> {
        let node = self.nodes.get(&self.find(full_path)?)?;
        if !node.is_live() {
            return None;
        }

        let mut result = HashMap::new();
        if let Some(children) = &node.children {
            for (name, id) in children {
                let Some(child) = self.nodes.get(id) else {
                    continue;
                };
                if let (true, Some(data)) = (child.is_live(), &child.data) {
                    result.insert(name.clone(), data.clone());
                }
            }
        }
        Some(result)
    }

    // ---- inputs ----

    /// Applies the terminal reply of an operation issued for `id`.
    pub fn on_reply(
        &mut self,
        id: NodeId,
        reply: OpReply,
    ) {
        OUTSTANDING_OPS.dec();
        if self.state == TreeState::Closed {
            trace!(?id, "absorbing reply after close");
        } else {
            match reply {
                OpReply::Data(reply) => self.process_data(id, reply),
                OpReply::Children(reply) => self.process_children(id, reply),
                OpReply::Exists(reply) => self.process_exists(id, reply),
            }
        }
        self.complete_op();
    }

    /// Reacts to a fired one-shot watch armed by node `id`.
    pub fn on_watch(
        &mut self,
        id: NodeId,
        event: WatchedEvent,
    ) {
        if self.state == TreeState::Closed {
            return;
        }
        let Some(node) = self.nodes.get(&id) else {
            trace!(?id, ?event, "ignoring watch of removed node");
            return;
        };
        debug!(path = node.path(), kind = ?event.kind, "watch fired");

        match event.kind {
            WatchKind::NodeCreated => {
                if id == self.root {
                    self.was_created(id);
                } else {
                    self.fail(
                        "Unhandled watch event",
                        Error::UnexpectedEvent {
                            path: event.path,
                            detail: "NodeCreated on non-root node".to_string(),
                        },
                    );
                }
            }
            WatchKind::NodeDeleted => self.was_deleted(id),
            WatchKind::NodeDataChanged => self.refresh_data(id),
            WatchKind::NodeChildrenChanged => self.refresh_children(id),
        }
    }

    pub fn on_connection_state(
        &mut self,
        state: ConnectionState,
    ) {
        if self.state != TreeState::Started {
            trace!(?state, "ignoring connection state outside STARTED");
            return;
        }
        debug!(?state, "connection state change");

        match state {
            ConnectionState::Suspended => {
                self.publish(TreeCacheEventType::ConnectionSuspended, None);
            }
            ConnectionState::Lost => {
                self.is_initialized = false;
                self.publish(TreeCacheEventType::ConnectionLost, None);
            }
            ConnectionState::Connected => self.was_created(self.root),
            ConnectionState::Reconnected => {
                self.was_reconnected(self.root);
                self.publish(TreeCacheEventType::ConnectionReconnected, None);
            }
            ConnectionState::ReadOnly => {}
        }
    }

    // ---- node transitions ----

    fn was_created(
        &mut self,
        id: NodeId,
    ) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let path = node.path().to_string();
        let traverse = self.should_traverse(node);

        self.issue(OpKind::GetData, id, path.clone());
        if traverse {
            self.issue(OpKind::GetChildren, id, path);
        }
    }

    fn was_reconnected(
        &mut self,
        id: NodeId,
    ) {
        self.was_created(id);
        let children: Vec<NodeId> = match self.nodes.get(&id).and_then(|n| n.children.as_ref()) {
            Some(children) => children.values().copied().collect(),
            None => return,
        };
        for child in children {
            self.was_reconnected(child);
        }
    }

    fn was_deleted(
        &mut self,
        id: NodeId,
    ) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let old_data = node.data.take();
        let old_state = std::mem::replace(&mut node.state, NodeState::Dead);
        let children = node.children.take();
        let parent = node.parent();
        let path = node.path().to_string();

        // Descendants go first.
        if let Some(children) = children {
            for child in children.into_values() {
                self.was_deleted(child);
            }
        }

        if let (NodeState::Live, Some(data)) = (old_state, old_data) {
            self.publish(TreeCacheEventType::NodeRemoved, Some(data));
        }

        match parent {
            None => {
                if self.state != TreeState::Closed {
                    debug!(%path, "root gone, watching for recreation");
                    self.issue(OpKind::Exists, id, path);
                }
            }
            Some(parent) => {
                if let Some(siblings) = self.nodes.get_mut(&parent).and_then(|p| p.children.as_mut()) {
                    siblings.retain(|_, child| *child != id);
                }
                self.nodes.remove(&id);
            }
        }
    }

    fn refresh_data(
        &mut self,
        id: NodeId,
    ) {
        if let Some(node) = self.nodes.get(&id) {
            let path = node.path().to_string();
            self.issue(OpKind::GetData, id, path);
        }
    }

    fn refresh_children(
        &mut self,
        id: NodeId,
    ) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if self.should_traverse(node) {
            let path = node.path().to_string();
            self.issue(OpKind::GetChildren, id, path);
        }
    }

    // ---- reply processing ----

    fn process_data(
        &mut self,
        id: NodeId,
        reply: DataReply,
    ) {
        match reply {
            DataReply::Ok { data, stat } => {
                let is_root = id == self.root;
                let cache_data = self.cache_data;
                let Some(node) = self.nodes.get_mut(&id) else {
                    debug!(?id, "discarding data of removed node");
                    return;
                };

                let fresh = ChildData::new(node.path(), stat, if cache_data { data } else { None });
                let added = if is_root {
                    std::mem::replace(&mut node.state, NodeState::Live) != NodeState::Live
                } else {
                    match node.state {
                        NodeState::Pending => {
                            node.state = NodeState::Live;
                            true
                        }
                        NodeState::Live => false,
                        NodeState::Dead => {
                            debug!(path = node.path(), "discarding data of dead node");
                            return;
                        }
                    }
                };

                let previous = node.data.replace(fresh.clone());
                if added {
                    self.publish(TreeCacheEventType::NodeAdded, Some(fresh));
                } else if previous.map_or(true, |p| p.stat().mzxid != stat.mzxid) {
                    self.publish(TreeCacheEventType::NodeUpdated, Some(fresh));
                }
            }
            DataReply::NoNode => self.was_deleted(id),
            DataReply::Failed(code) => self.process_failure(OpKind::GetData, id, code),
        }
    }

    fn process_children(
        &mut self,
        id: NodeId,
        reply: ChildrenReply,
    ) {
        match reply {
            ChildrenReply::Ok { children, stat } => {
                let Some(node) = self.nodes.get_mut(&id) else {
                    debug!(?id, "discarding children of removed node");
                    return;
                };
                if node.state == NodeState::Dead {
                    debug!(path = node.path(), "discarding children of dead node");
                    return;
                }

                // Same mzxid: only child-related stat fields moved. A newer
                // mzxid is left for the data reply to publish.
                if let Some(data) = node.data.as_mut() {
                    if data.stat().mzxid == stat.mzxid {
                        data.set_stat(stat);
                    }
                }

                if children.is_empty() {
                    return;
                }

                let parent_path = node.path().to_string();
                let depth = node.depth() + 1;
                let known = node.children.get_or_insert_with(BTreeMap::new);
                let mut fresh: Vec<String> = children.into_iter().filter(|c| !known.contains_key(c)).collect();
                fresh.sort();
                fresh.dedup();

                for name in fresh {
                    let full_path = path::make_path(&parent_path, &name);
                    if !self.selector.accept_child(&full_path) {
                        continue;
                    }
                    let child = self.allocate(full_path, id, depth);
                    if let Some(known) = self.nodes.get_mut(&id).and_then(|n| n.children.as_mut()) {
                        known.insert(name, child);
                    }
                    self.was_created(child);
                }
            }
            ChildrenReply::NoNode => self.was_deleted(id),
            ChildrenReply::Failed(code) => self.process_failure(OpKind::GetChildren, id, code),
        }
    }

    fn process_exists(
        &mut self,
        id: NodeId,
        reply: ExistsReply,
    ) {
        match reply {
            ExistsReply::Ok(_) => {
                if id != self.root {
                    trace!(?id, "ignoring exists reply of non-root node");
                    return;
                }
                let Some(root) = self.nodes.get_mut(&id) else {
                    return;
                };
                if root.state == NodeState::Dead {
                    root.state = NodeState::Pending;
                }
                self.was_created(id);
            }
            // The armed watch reports the creation.
            ExistsReply::NoNode => {}
            ExistsReply::Failed(code) => self.process_failure(OpKind::Exists, id, code),
        }
    }

    fn process_failure(
        &mut self,
        kind: OpKind,
        id: NodeId,
        code: ReturnCode,
    ) {
        let Some(node) = self.nodes.get(&id) else {
            trace!(?id, ?code, "failure of removed node");
            return;
        };
        let path = node.path().to_string();
        RPC_FAILURES.with_label_values(&[kind.as_str()]).inc();
        warn!(op = kind.as_str(), %path, ?code, "watched read failed");

        if !code.is_transient() {
            self.fail(
                "Watched read failed",
                Error::Rpc {
                    op: kind.as_str(),
                    path,
                    code,
                },
            );
        }
    }

    // ---- bookkeeping ----

    fn should_traverse(
        &self,
        node: &TreeNode,
    ) -> bool {
        node.depth() < self.max_depth && self.selector.traverse_children(node.path())
    }

    fn allocate(
        &mut self,
        path: String,
        parent: NodeId,
        depth: usize,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, TreeNode::new(path, Some(parent), depth));
        id
    }

    fn issue(
        &mut self,
        kind: OpKind,
        node: NodeId,
        path: String,
    ) {
        self.outstanding_ops += 1;
        if self.state == TreeState::Started {
            trace!(op = kind.as_str(), %path, "issue");
            OUTSTANDING_OPS.inc();
            self.operations.push(Operation { kind, node, path });
        }
    }

    fn complete_op(&mut self) {
        self.outstanding_ops = self.outstanding_ops.saturating_sub(1);
        if self.outstanding_ops == 0 && !self.is_initialized {
            self.is_initialized = true;
            self.publish(TreeCacheEventType::Initialized, None);
        }
    }

    fn publish(
        &mut self,
        event_type: TreeCacheEventType,
        data: Option<ChildData>,
    ) {
        if self.state == TreeState::Closed {
            return;
        }
        let event = match data {
            Some(data) => TreeCacheEvent::node(event_type, data),
            None => TreeCacheEvent::connection(event_type),
        };
        debug!(%event, "publish");
        self.outcomes.push(Outcome::Event(event));
    }

    fn fail(
        &mut self,
        message: &str,
        error: Error,
    ) {
        self.outcomes.push(Outcome::Failure {
            message: message.to_string(),
            error,
        });
    }
}
