//! Test scaffolding shared by the unit tests: logger setup, an in-memory
//! coordination service and an event collector.
mod common;
mod in_memory_zk;

pub use common::*;
pub use in_memory_zk::*;
