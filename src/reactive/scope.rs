use std::cell::RefCell;

use super::graph::{Memo, NodeId, ReactiveGraph, Signal};

/// Read access handed to a memo while it evaluates.
///
/// Every read made through a scope is recorded so the graph can rebuild the
/// memo's dependency edges once evaluation finishes.
pub struct Scope<'g> {
    graph: &'g ReactiveGraph,
    reads: RefCell<Vec<NodeId>>,
}

impl<'g> Scope<'g> {
    pub(super) fn new(graph: &'g ReactiveGraph) -> Self {
        Self {
            graph,
            reads: RefCell::new(Vec::new()),
        }
    }

    pub(super) fn into_reads(self) -> Vec<NodeId> {
        self.reads.into_inner()
    }

    pub fn get<T: Clone + 'static>(&self, signal: Signal<T>) -> T {
        self.track(signal.id());
        self.graph.get(signal)
    }

    pub fn read<T: Clone + 'static>(&self, memo: Memo<T>) -> T {
        self.track(memo.id());
        self.graph.read(memo)
    }

    fn track(&self, id: NodeId) {
        self.reads.borrow_mut().push(id);
    }
}
