//! Change notifications published by a tree cache.

#[cfg(test)]
mod event_test;

use std::fmt;
use std::time::SystemTime;

use bytes::Bytes;

use crate::Stat;

/// Snapshot of one cached node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildData {
    path: String,
    stat: Stat,
    data: Option<Bytes>,
}

impl ChildData {
    pub fn new(
        path: impl Into<String>,
        stat: Stat,
        data: Option<Bytes>,
    ) -> Self {
        Self {
            path: path.into(),
            stat,
            data,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stat(&self) -> &Stat {
        &self.stat
    }

    /// Payload, or `None` when the cache was built without data caching.
    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub(crate) fn set_stat(
        &mut self,
        stat: Stat,
    ) {
        self.stat = stat;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeCacheEventType {
    /// A node was added to the tree
    NodeAdded,
    /// A node's data was changed
    NodeUpdated,
    /// A node was removed from the tree
    NodeRemoved,
    /// The connection was suspended. Changes may be missed until it comes back.
    ConnectionSuspended,
    /// The connection was re-established and the tree is being refreshed.
    ConnectionReconnected,
    /// The session was lost. The cached data stays but may be stale.
    ConnectionLost,
    /// The initial population of the tree has completed. Sent again after each
    /// lost session once the tree has been fully re-read.
    Initialized,
}

impl TreeCacheEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeCacheEventType::NodeAdded => "NODE_ADDED",
            TreeCacheEventType::NodeUpdated => "NODE_UPDATED",
            TreeCacheEventType::NodeRemoved => "NODE_REMOVED",
            TreeCacheEventType::ConnectionSuspended => "CONNECTION_SUSPENDED",
            TreeCacheEventType::ConnectionReconnected => "CONNECTION_RECONNECTED",
            TreeCacheEventType::ConnectionLost => "CONNECTION_LOST",
            TreeCacheEventType::Initialized => "INITIALIZED",
        }
    }
}

impl fmt::Display for TreeCacheEventType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeCacheEvent {
    event_type: TreeCacheEventType,
    data: Option<ChildData>,
    timestamp: SystemTime,
}

impl TreeCacheEvent {
    pub fn new(
        event_type: TreeCacheEventType,
        data: Option<ChildData>,
    ) -> Self {
        Self {
            event_type,
            data,
            timestamp: SystemTime::now(),
        }
    }

    pub(crate) fn node(
        event_type: TreeCacheEventType,
        data: ChildData,
    ) -> Self {
        Self::new(event_type, Some(data))
    }

    /// An event carrying no node data: connection changes and INITIALIZED.
    pub(crate) fn connection(event_type: TreeCacheEventType) -> Self {
        Self::new(event_type, None)
    }

    pub fn event_type(&self) -> TreeCacheEventType {
        self.event_type
    }

    pub fn data(&self) -> Option<&ChildData> {
        self.data.as_ref()
    }

    /// Path of the affected node; `None` for connection and init events.
    pub fn path(&self) -> Option<&str> {
        self.data.as_ref().map(ChildData::path)
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

impl fmt::Display for TreeCacheEvent {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "TreeCacheEvent {{ type = {}, path = ", self.event_type)?;
        match self.path() {
            Some(path) => write!(f, "{path}")?,
            None => write!(f, "None")?,
        }
        write!(f, ", data = ")?;
        match self.data.as_ref().and_then(ChildData::data) {
            Some(bytes) => write!(f, "{} bytes", bytes.len())?,
            None => write!(f, "None")?,
        }
        write!(f, " }}")
    }
}
