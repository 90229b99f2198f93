//! Controls which nodes a tree cache processes.
//!
//! When iterating over the children of a parent node, a node's children are
//! queried only if [`TreeCacheSelector::traverse_children`] returns true. When
//! caching the list of nodes for a parent, a child is tracked only if
//! [`TreeCacheSelector::accept_child`] returns true.
//!
//! Given:
//! ```text
//! root
//!     n1-a
//!     n1-b
//!         n2-a
//!         n2-b
//!             n3-a
//!     n1-c
//!     n1-d
//! ```
//! a cache working only with n1-a, n1-b, n2-a, n2-b and n1-d returns false from
//! `traverse_children("/root/n1-b/n2-b")` and from `accept_child("/root/n1-c")`.

#[cfg(test)]
mod selector_test;

use std::fmt::Debug;

/// Both predicates receive full znode paths and must be side-effect free: they
/// are re-evaluated on every refresh and after each reconnection.
pub trait TreeCacheSelector: Send + Sync + 'static {
    /// Return true if children of this path should be cached. When false the
    /// node is never queried for children.
    fn traverse_children(
        &self,
        full_path: &str,
    ) -> bool;

    /// Return true if this node should be tracked by the cache.
    fn accept_child(
        &self,
        full_path: &str,
    ) -> bool;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTreeCacheSelector;

impl TreeCacheSelector for DefaultTreeCacheSelector {
    fn traverse_children(
        &self,
        _full_path: &str,
    ) -> bool {
        true
    }

    fn accept_child(
        &self,
        _full_path: &str,
    ) -> bool {
        true
    }
}

/// Selector assembled from two closures.
pub struct FnSelector<T, A> {
    traverse: T,
    accept: A,
}

impl<T, A> FnSelector<T, A>
where
    T: Fn(&str) -> bool + Send + Sync + 'static,
    A: Fn(&str) -> bool + Send + Sync + 'static,
{
    pub fn new(
        traverse: T,
        accept: A,
    ) -> Self {
        Self { traverse, accept }
    }
}

impl<T, A> Debug for FnSelector<T, A> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("FnSelector").finish_non_exhaustive()
    }
}

impl<T, A> TreeCacheSelector for FnSelector<T, A>
where
    T: Fn(&str) -> bool + Send + Sync + 'static,
    A: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn traverse_children(
        &self,
        full_path: &str,
    ) -> bool {
        (self.traverse)(full_path)
    }

    fn accept_child(
        &self,
        full_path: &str,
    ) -> bool {
        (self.accept)(full_path)
    }
}
