//! Public face of the cache: the [`TreeCache`] handle, its builder and the
//! task that drives the tree.

mod builder;
mod event_loop;
mod tree_cache;

#[cfg(test)]
mod builder_test;

pub use builder::*;
pub use tree_cache::*;
