//! The mirrored tree: per-node state machine and tree-level coordination.

mod controller;
mod node;


pub use controller::*;
pub use node::*;
