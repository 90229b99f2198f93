use std::collections::BTreeMap;

use crate::ChildData;

/// Arena handle of a tree node. Ids are never reused within one cache, so a
/// reply or watch addressed to a removed node can be recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeState {
    /// Existence or content not confirmed yet
    Pending,
    /// Confirmed to exist, data known
    Live,
    /// Confirmed deleted or unreachable
    Dead,
}

/// One position in the mirrored tree.
#[derive(Debug)]
pub(crate) struct TreeNode {
    path: String,
    parent: Option<NodeId>,
    pub(crate) children: Option<BTreeMap<String, NodeId>>,
    pub(crate) data: Option<ChildData>,
    depth: usize,
    pub(crate) state: NodeState,
}

impl TreeNode {
    pub(crate) fn new(
        path: String,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Self {
        Self {
            path,
            parent,
            children: Some(BTreeMap::new()),
            data: None,
            depth,
            state: NodeState::Pending,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    #[cfg(test)]
    pub fn state(&self) -> NodeState {
        self.state
    }

    #[cfg(test)]
    pub fn data(&self) -> Option<&ChildData> {
        self.data.as_ref()
    }

    #[cfg(test)]
    pub fn children(&self) -> Option<&BTreeMap<String, NodeId>> {
        self.children.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.state == NodeState::Live
    }
}
