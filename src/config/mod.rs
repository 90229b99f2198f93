//! Tree cache configuration.
//!
//! Values are layered:
//! 1. Defaults from code
//! 2. Configuration file named by `CONFIG_PATH`
//! 3. Environment variables with the `TREECACHE__` prefix (highest priority)


use std::env;
use std::fmt::Debug;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::path::validate_path;
use crate::Error;
use crate::Result;

const ENV_PREFIX: &str = "TREECACHE";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TreeCacheConfig {
    /// Root of the mirrored subtree
    #[serde(default = "default_path")]
    pub path: String,

    /// Keep node payloads in memory. When false only stats are cached and
    /// events carry no payload.
    #[serde(default = "default_cache_data")]
    pub cache_data: bool,

    /// Maximum depth below the root to explore. 0 watches the root only.
    ///
    /// Default: u32::MAX (unbounded)
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Create the root and its ancestors on start
    #[serde(default)]
    pub create_parent_nodes: bool,

    /// Capacity of the command channel between the handle and the cache task
    #[serde(default = "default_command_buffer_size")]
    pub command_buffer_size: usize,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_cache_data() -> bool {
    true
}

fn default_max_depth() -> u32 {
    u32::MAX
}

fn default_command_buffer_size() -> usize {
    1024
}

impl Default for TreeCacheConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            cache_data: default_cache_data(),
            max_depth: default_max_depth(),
            create_parent_nodes: false,
            command_buffer_size: default_command_buffer_size(),
        }
    }
}

impl TreeCacheConfig {
    /// Loads defaults, the optional `CONFIG_PATH` file and `TREECACHE__*`
    /// environment variables. Not validated; call [`Self::validate`].
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Merges a file over the current values; environment variables still win.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn validate(self) -> Result<Self> {
        validate_path(&self.path)?;

        if self.command_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "command_buffer_size must be greater than 0".to_string(),
            )));
        }

        Ok(self)
    }

    pub(crate) fn max_depth(&self) -> usize {
        usize::try_from(self.max_depth).unwrap_or(usize::MAX)
    }
}
