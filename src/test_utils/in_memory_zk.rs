//! In-memory coordination service for tests.
//!
//! Keeps a znode tree with zxid bookkeeping and delivers one-shot watches with
//! the server's semantics: data watches fire on data change and deletion,
//! child watches on child-set change and deletion, existence watches on
//! creation. Each path holds a set of watchers, so re-arming an equal watcher
//! is a no-op. While the session is not connected every read fails with
//! `ConnectionLoss` and arms nothing.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::path;
use crate::ChildrenReply;
use crate::DataReply;
use crate::ExistsReply;
use crate::KeeperState;
use crate::ReturnCode;
use crate::Stat;
use crate::WatchKind;
use crate::WatchedEvent;
use crate::Watcher;
use crate::ZkClient;
use crate::ZkFramework;

struct ZNode {
    data: Bytes,
    stat: Stat,
}

struct ZkState {
    nodes: BTreeMap<String, ZNode>,
    zxid: i64,
    keeper_state: KeeperState,
    data_watches: HashMap<String, Vec<Watcher>>,
    child_watches: HashMap<String, Vec<Watcher>>,
    exist_watches: HashMap<String, Vec<Watcher>>,
}

impl ZkState {
    fn is_connected(&self) -> bool {
        matches!(
            self.keeper_state,
            KeeperState::SyncConnected | KeeperState::SaslAuthenticated | KeeperState::ConnectedReadOnly
        )
    }

    fn next_zxid(&mut self) -> i64 {
        self.zxid += 1;
        self.zxid
    }

    fn children_of(
        &self,
        parent: &str,
    ) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|k| k.as_str() != "/" && path::parent_path(k) == Ok(Some(parent)))
            .filter_map(|k| path::node_from_path(k).ok().map(str::to_string))
            .collect()
    }

    fn arm(
        watches: &mut HashMap<String, Vec<Watcher>>,
        path: &str,
        watcher: Watcher,
    ) {
        let armed = watches.entry(path.to_string()).or_default();
        if !armed.contains(&watcher) {
            armed.push(watcher);
        }
    }

    fn fire(
        watches: &mut HashMap<String, Vec<Watcher>>,
        path: &str,
        kind: WatchKind,
    ) {
        for watcher in watches.remove(path).unwrap_or_default() {
            watcher.fire(WatchedEvent::new(kind, path));
        }
    }

    fn create(
        &mut self,
        path: &str,
        data: &[u8],
    ) -> Result<(), ReturnCode> {
        path::validate_path(path).map_err(|_| ReturnCode::BadArguments)?;
        if self.nodes.contains_key(path) {
            return Err(ReturnCode::NodeExists);
        }
        let parent = path::parent_path(path)
            .map_err(|_| ReturnCode::BadArguments)?
            .ok_or(ReturnCode::NodeExists)?
            .to_string();
        if !self.nodes.contains_key(&parent) {
            return Err(ReturnCode::NoNode);
        }

        let zxid = self.next_zxid();
        self.nodes.insert(
            path.to_string(),
            ZNode {
                data: Bytes::copy_from_slice(data),
                stat: Stat {
                    czxid: zxid,
                    mzxid: zxid,
                    ctime: zxid,
                    mtime: zxid,
                    pzxid: zxid,
                    data_length: data.len() as i32,
                    ..Default::default()
                },
            },
        );
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.stat.cversion += 1;
            parent_node.stat.num_children += 1;
            parent_node.stat.pzxid = zxid;
        }

        Self::fire(&mut self.exist_watches, path, WatchKind::NodeCreated);
        Self::fire(&mut self.child_watches, &parent, WatchKind::NodeChildrenChanged);
        Ok(())
    }

    fn set_data(
        &mut self,
        path: &str,
        data: &[u8],
    ) -> Result<(), ReturnCode> {
        let zxid = self.next_zxid();
        let node = self.nodes.get_mut(path).ok_or(ReturnCode::NoNode)?;
        node.data = Bytes::copy_from_slice(data);
        node.stat.mzxid = zxid;
        node.stat.mtime = zxid;
        node.stat.version += 1;
        node.stat.data_length = data.len() as i32;

        Self::fire(&mut self.data_watches, path, WatchKind::NodeDataChanged);
        Ok(())
    }

    fn delete(
        &mut self,
        path: &str,
    ) -> Result<(), ReturnCode> {
        if !self.nodes.contains_key(path) {
            return Err(ReturnCode::NoNode);
        }
        if !self.children_of(path).is_empty() {
            return Err(ReturnCode::NotEmpty);
        }
        let zxid = self.next_zxid();
        self.nodes.remove(path);

        let parent = path::parent_path(path).ok().flatten().map(str::to_string);
        if let Some(parent_node) = parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            parent_node.stat.cversion += 1;
            parent_node.stat.num_children -= 1;
            parent_node.stat.pzxid = zxid;
        }

        Self::fire(&mut self.data_watches, path, WatchKind::NodeDeleted);
        Self::fire(&mut self.child_watches, path, WatchKind::NodeDeleted);
        if let Some(parent) = parent {
            Self::fire(&mut self.child_watches, &parent, WatchKind::NodeChildrenChanged);
        }
        Ok(())
    }
}

pub struct InMemoryZk {
    state: Mutex<ZkState>,
    framework: Mutex<Weak<ZkFramework>>,
}

impl InMemoryZk {
    /// A connected server holding only `/`.
    pub fn new() -> Arc<Self> {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            ZNode {
                data: Bytes::new(),
                stat: Stat::default(),
            },
        );
        Arc::new(Self {
            state: Mutex::new(ZkState {
                nodes,
                zxid: 0,
                keeper_state: KeeperState::SyncConnected,
                data_watches: HashMap::new(),
                child_watches: HashMap::new(),
                exist_watches: HashMap::new(),
            }),
            framework: Mutex::new(Weak::new()),
        })
    }

    /// Wraps the server in a framework whose session is already established.
    pub fn framework(self: &Arc<Self>) -> Arc<ZkFramework> {
        let framework = ZkFramework::new(self.clone());
        *self.framework.lock() = Arc::downgrade(&framework);
        framework.process_state(KeeperState::SyncConnected);
        framework
    }

    pub fn create(
        &self,
        path: &str,
        data: &[u8],
    ) -> Result<(), ReturnCode> {
        self.state.lock().create(path, data)
    }

    pub fn set_data(
        &self,
        path: &str,
        data: &[u8],
    ) -> Result<(), ReturnCode> {
        self.state.lock().set_data(path, data)
    }

    pub fn delete(
        &self,
        path: &str,
    ) -> Result<(), ReturnCode> {
        self.state.lock().delete(path)
    }

    pub fn contains(
        &self,
        path: &str,
    ) -> bool {
        self.state.lock().nodes.contains_key(path)
    }

    /// Number of (data, child) watchers armed on `path`.
    pub fn watch_counts(
        &self,
        path: &str,
    ) -> (usize, usize) {
        let state = self.state.lock();
        let count = |watches: &HashMap<String, Vec<Watcher>>| watches.get(path).map_or(0, Vec::len);
        (count(&state.data_watches), count(&state.child_watches))
    }

    /// Changes the session state and reports it to the framework.
    /// `Expired` drops every armed watch, as a lost session does.
    pub fn set_state(
        &self,
        raw: KeeperState,
    ) {
        {
            let mut state = self.state.lock();
            state.keeper_state = raw;
            if raw == KeeperState::Expired {
                state.data_watches.clear();
                state.child_watches.clear();
                state.exist_watches.clear();
            }
        }
        let framework = self.framework.lock().upgrade();
        if let Some(framework) = framework {
            framework.process_state(raw);
        }
    }
}

#[async_trait]
impl ZkClient for InMemoryZk {
    async fn get_data(
        &self,
        path: &str,
        watcher: Option<Watcher>,
    ) -> DataReply {
        let mut state = self.state.lock();
        if !state.is_connected() {
            return DataReply::Failed(ReturnCode::ConnectionLoss);
        }
        let Some(node) = state.nodes.get(path) else {
            return DataReply::NoNode;
        };
        let reply = DataReply::Ok {
            data: Some(node.data.clone()),
            stat: node.stat,
        };
        if let Some(watcher) = watcher {
            ZkState::arm(&mut state.data_watches, path, watcher);
        }
        reply
    }

    async fn get_children(
        &self,
        path: &str,
        watcher: Option<Watcher>,
    ) -> ChildrenReply {
        let mut state = self.state.lock();
        if !state.is_connected() {
            return ChildrenReply::Failed(ReturnCode::ConnectionLoss);
        }
        let Some(node) = state.nodes.get(path) else {
            return ChildrenReply::NoNode;
        };
        let stat = node.stat;
        let children = state.children_of(path);
        if let Some(watcher) = watcher {
            ZkState::arm(&mut state.child_watches, path, watcher);
        }
        ChildrenReply::Ok { children, stat }
    }

    async fn exists(
        &self,
        path: &str,
        watcher: Option<Watcher>,
    ) -> ExistsReply {
        let mut state = self.state.lock();
        if !state.is_connected() {
            return ExistsReply::Failed(ReturnCode::ConnectionLoss);
        }
        match state.nodes.get(path).map(|n| n.stat) {
            Some(stat) => {
                if let Some(watcher) = watcher {
                    ZkState::arm(&mut state.data_watches, path, watcher);
                }
                ExistsReply::Ok(stat)
            }
            None => {
                if let Some(watcher) = watcher {
                    ZkState::arm(&mut state.exist_watches, path, watcher);
                }
                ExistsReply::NoNode
            }
        }
    }

    async fn mkdirs(
        &self,
        path: &str,
        make_last_node: bool,
    ) -> Result<(), ReturnCode> {
        let mut state = self.state.lock();
        if !state.is_connected() {
            return Err(ReturnCode::ConnectionLoss);
        }
        let mut targets = path::ancestors(path).map_err(|_| ReturnCode::BadArguments)?;
        if !make_last_node {
            targets.pop();
        }
        for target in targets {
            match state.create(&target, &[]) {
                Ok(()) | Err(ReturnCode::NodeExists) => {}
                Err(code) => return Err(code),
            }
        }
        Ok(())
    }

    fn state(&self) -> KeeperState {
        self.state.lock().keeper_state
    }
}
