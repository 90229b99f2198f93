//! Tree cache error hierarchy
//!
//! Expected outcomes of watched reads (no such node, connection loss, ...) are
//! not errors: they travel as reply variants (see [`crate::DataReply`]). The
//! types below cover what can surface to the caller or to error listeners.

use config::ConfigError;

use crate::ReturnCode;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed znode path handed to the builder or a lookup
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cache already started")]
    AlreadyStarted,

    #[error("cache is closed")]
    Closed,

    /// Ancestor creation failed during `start()`
    #[error("Failed to create parent nodes of {path}: {code:?}")]
    CreateContainers { path: String, code: ReturnCode },

    /// Non-transient failure of a watched read
    #[error("{op} on {path} failed with {code:?}")]
    Rpc {
        op: &'static str,
        path: String,
        code: ReturnCode,
    },

    /// A watch notification that makes no sense for the node it was armed on
    #[error("Unexpected {detail} on {path}")]
    UnexpectedEvent { path: String, detail: String },

    /// A change listener returned an error
    #[error("Listener error: {0}")]
    Listener(String),

    /// A change listener panicked
    #[error("Listener panicked: {0}")]
    ListenerPanic(String),

    /// User code (e.g. a selector) panicked while the cache task handled an
    /// input. The input is dropped and the task keeps running.
    #[error("Panicked while handling {input}: {message}")]
    HandlerPanic {
        input: &'static str,
        message: String,
    },
}

/// Reasons a znode path string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Path length must be > 0")]
    Empty,

    #[error("Path must start with / character")]
    MissingLeadingSlash,

    #[error("Path must not end with / character")]
    TrailingSlash,

    #[error("Invalid path string \"{path}\" caused by {reason} @{index}")]
    Invalid {
        path: String,
        reason: &'static str,
        index: usize,
    },
}
