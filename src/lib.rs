//! A watch-driven local mirror of a znode subtree.
//!
//! [`TreeCache`] keeps every node under a root path in memory, re-arming
//! one-shot watches as they fire, and reports changes to listeners as ordered
//! [`TreeCacheEvent`]s. It survives connection suspension and session loss by
//! re-reading the known tree once the session is back.

mod cache;
mod client;
mod config;
mod connection;
mod errors;
mod event;
mod listener;
pub mod metrics;
pub mod path;
mod selector;
mod tree;

pub use cache::*;
pub use client::*;
pub use config::*;
pub use connection::*;
pub use errors::*;
pub use event::*;
pub use listener::TreeCacheListener;
pub use listener::UnhandledErrorListener;
pub use selector::*;
pub(crate) use tree::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
