//! Dependency-tracked computation cells.

mod graph;
mod scope;

pub use graph::{Memo, NodeId, ReactiveGraph, Signal};
pub use scope::Scope;
