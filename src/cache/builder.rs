//! Fluent construction of a [`TreeCache`].
//!
//! ```ignore
//! let cache = TreeCacheBuilder::new(framework, "/app/config")
//!     .cache_data(false)
//!     .max_depth(1)
//!     .create_parent_nodes(true)
//!     .build()?;
//! ```
//!
//! Settings can also come from a loaded [`TreeCacheConfig`] via
//! [`TreeCacheBuilder::config`]; setters called afterwards override it.

use std::fmt::Debug;
use std::sync::Arc;

use tracing::debug;

use crate::DefaultTreeCacheSelector;
use crate::Result;
use crate::TreeCache;
use crate::TreeCacheConfig;
use crate::TreeCacheSelector;
use crate::ZkFramework;

pub struct TreeCacheBuilder {
    framework: Arc<ZkFramework>,
    config: TreeCacheConfig,
    selector: Arc<dyn TreeCacheSelector>,
}

impl Debug for TreeCacheBuilder {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TreeCacheBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TreeCacheBuilder {
    pub fn new(
        framework: Arc<ZkFramework>,
        path: impl Into<String>,
    ) -> Self {
        let config = TreeCacheConfig {
            path: path.into(),
            ..Default::default()
        };
        Self::from_config(framework, config)
    }

    pub fn from_config(
        framework: Arc<ZkFramework>,
        config: TreeCacheConfig,
    ) -> Self {
        Self {
            framework,
            config,
            selector: Arc::new(DefaultTreeCacheSelector),
        }
    }

    /// Replaces every setting, including the root path.
    pub fn config(
        mut self,
        config: TreeCacheConfig,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn cache_data(
        mut self,
        cache_data: bool,
    ) -> Self {
        self.config.cache_data = cache_data;
        self
    }

    pub fn max_depth(
        mut self,
        max_depth: u32,
    ) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn create_parent_nodes(
        mut self,
        create_parent_nodes: bool,
    ) -> Self {
        self.config.create_parent_nodes = create_parent_nodes;
        self
    }

    pub fn selector(
        mut self,
        selector: Arc<dyn TreeCacheSelector>,
    ) -> Self {
        self.selector = selector;
        self
    }

    /// Validates the settings and assembles the cache. Nothing is read from
    /// the server until [`TreeCache::start`].
    pub fn build(self) -> Result<TreeCache> {
        let config = self.config.validate()?;
        debug!(?config, "building tree cache");
        Ok(TreeCache::new(self.framework, config, self.selector))
    }
}
