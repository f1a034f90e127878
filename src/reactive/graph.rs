use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

use super::scope::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    fn index(self) -> usize {
        self.0
    }
}

/// Writable source cell.
pub struct Signal<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

/// Memoised derived cell.
pub struct Memo<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

macro_rules! handle_impls {
    ($($handle:ident),*) => {
        $(
            impl<T> $handle<T> {
                fn new(id: NodeId) -> Self {
                    Self {
                        id,
                        _marker: PhantomData,
                    }
                }

                pub fn id(self) -> NodeId {
                    self.id
                }
            }

            impl<T> Clone for $handle<T> {
                fn clone(&self) -> Self {
                    *self
                }
            }

            impl<T> Copy for $handle<T> {}

            impl<T> PartialEq for $handle<T> {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl<T> Eq for $handle<T> {}

            impl<T> Hash for $handle<T> {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    self.id.hash(state);
                }
            }

            impl<T> fmt::Debug for $handle<T> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}({})", stringify!($handle), self.id.0)
                }
            }
        )*
    };
}

handle_impls!(Signal, Memo);

type Compute = Rc<dyn Fn(&Scope<'_>) -> Box<dyn Any>>;

enum NodeKind {
    Signal,
    Memo(Compute),
}

struct Node {
    kind: NodeKind,
    value: RefCell<Option<Box<dyn Any>>>,
    dirty: Cell<bool>,
    evaluating: Cell<bool>,
    evaluations: Cell<u64>,
    dependencies: RefCell<Vec<NodeId>>,
    dependents: RefCell<BTreeSet<NodeId>>,
}

impl Node {
    fn new(kind: NodeKind, value: Option<Box<dyn Any>>) -> Self {
        let dirty = matches!(kind, NodeKind::Memo(_));
        Self {
            kind,
            value: RefCell::new(value),
            dirty: Cell::new(dirty),
            evaluating: Cell::new(false),
            evaluations: Cell::new(0),
            dependencies: RefCell::new(Vec::new()),
            dependents: RefCell::new(BTreeSet::new()),
        }
    }
}

/// Arena of signals and memos with explicit dependency edges.
///
/// Memos re-evaluate lazily: a signal write marks every transitive dependent
/// dirty, and the next read of a dirty memo recomputes it and re-records the
/// set of nodes it read.
#[derive(Default)]
pub struct ReactiveGraph {
    nodes: Vec<Node>,
}

impl ReactiveGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn signal<T: 'static>(&mut self, initial: T) -> Signal<T> {
        let id = self.push(Node::new(NodeKind::Signal, Some(Box::new(initial))));
        Signal::new(id)
    }

    pub fn memo<T, F>(&mut self, compute: F) -> Memo<T>
    where
        T: Clone + 'static,
        F: Fn(&Scope<'_>) -> T + 'static,
    {
        let compute: Compute = Rc::new(move |scope| Box::new(compute(scope)) as Box<dyn Any>);
        let id = self.push(Node::new(NodeKind::Memo(compute), None));
        Memo::new(id)
    }

    /// Untracked read of a signal.
    pub fn get<T: Clone + 'static>(&self, signal: Signal<T>) -> T {
        self.cached(signal.id)
    }

    pub fn set<T: 'static>(&mut self, signal: Signal<T>, value: T) {
        let node = &mut self.nodes[signal.id.index()];
        *node.value.get_mut() = Some(Box::new(value));
        self.invalidate_dependents(signal.id);
    }

    /// Untracked read of a memo, recomputing it first when dirty.
    pub fn read<T: Clone + 'static>(&self, memo: Memo<T>) -> T {
        self.refresh(memo.id);
        self.cached(memo.id)
    }

    /// Runs `f` with a scope whose reads are not recorded anywhere.
    pub fn untracked<R>(&self, f: impl FnOnce(&Scope<'_>) -> R) -> R {
        let scope = Scope::new(self);
        f(&scope)
    }

    pub fn is_dirty<T>(&self, memo: Memo<T>) -> bool {
        self.nodes[memo.id.index()].dirty.get()
    }

    pub fn evaluation_count<T>(&self, memo: Memo<T>) -> u64 {
        self.nodes[memo.id.index()].evaluations.get()
    }

    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.index()].dependencies.borrow().clone()
    }

    pub fn dependents(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.index()].dependents.borrow().iter().copied().collect()
    }

    /// Nodes created since the graph held `start` of them.
    pub fn created_since(&self, start: usize) -> Vec<NodeId> {
        (start..self.nodes.len()).map(NodeId).collect()
    }

    /// Detaches the memos among `ids` that nothing outside `ids` reads.
    ///
    /// A detached memo drops its cached value and its dependency edges, so
    /// later writes no longer walk into it. The handle stays valid: the next
    /// read recomputes and records fresh edges. Returns the number detached.
    pub fn release(&mut self, ids: &[NodeId]) -> usize {
        let mut released: BTreeSet<NodeId> = ids
            .iter()
            .copied()
            .filter(|id| matches!(self.node(*id).kind, NodeKind::Memo(_)))
            .collect();
        loop {
            let read_outside: Vec<NodeId> = released
                .iter()
                .copied()
                .filter(|id| {
                    self.node(*id)
                        .dependents
                        .borrow()
                        .iter()
                        .any(|dependent| !released.contains(dependent))
                })
                .collect();
            if read_outside.is_empty() {
                break;
            }
            for id in read_outside {
                released.remove(&id);
            }
        }

        for &id in &released {
            let node = &mut self.nodes[id.index()];
            let dependencies = std::mem::take(node.dependencies.get_mut());
            node.dependents.get_mut().clear();
            *node.value.get_mut() = None;
            node.dirty.set(true);
            for dependency in dependencies {
                self.nodes[dependency.index()].dependents.get_mut().remove(&id);
            }
        }
        released.len()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn cached<T: Clone + 'static>(&self, id: NodeId) -> T {
        let slot = self.node(id).value.borrow();
        match slot.as_ref().and_then(|value| value.downcast_ref::<T>()) {
            Some(value) => value.clone(),
            None => panic!("reactive node {id:?} does not hold a value of the requested type"),
        }
    }

    fn invalidate_dependents(&mut self, id: NodeId) {
        // A dirty node's dependents are already dirty, so the walk stops there.
        let mut pending: Vec<NodeId> = self.node(id).dependents.borrow().iter().copied().collect();
        while let Some(next) = pending.pop() {
            let node = self.node(next);
            if node.dirty.replace(true) {
                continue;
            }
            pending.extend(node.dependents.borrow().iter().copied());
        }
    }

    fn refresh(&self, id: NodeId) {
        let node = self.node(id);
        if !node.dirty.get() {
            return;
        }
        let NodeKind::Memo(compute) = &node.kind else {
            return;
        };
        let compute = Rc::clone(compute);

        assert!(
            !node.evaluating.replace(true),
            "reactive cycle detected while evaluating {id:?}"
        );
        let scope = Scope::new(self);
        let value = compute(&scope);
        node.evaluating.set(false);

        let mut reads = scope.into_reads();
        reads.sort_unstable();
        reads.dedup();

        let stale = node.dependencies.replace(reads.clone());
        for dependency in stale {
            self.node(dependency).dependents.borrow_mut().remove(&id);
        }
        for dependency in reads {
            self.node(dependency).dependents.borrow_mut().insert(id);
        }

        *node.value.borrow_mut() = Some(value);
        node.evaluations.set(node.evaluations.get() + 1);
        node.dirty.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::ReactiveGraph;

    #[test]
    fn memo_is_cached_until_a_dependency_changes() {
        let mut graph = ReactiveGraph::new();
        let base = graph.signal(2.0_f64);
        let doubled = graph.memo(move |scope| scope.get(base) * 2.0);

        assert!(graph.is_dirty(doubled));
        assert_eq!(graph.read(doubled), 4.0);
        assert_eq!(graph.read(doubled), 4.0);
        assert_eq!(graph.evaluation_count(doubled), 1);

        graph.set(base, 5.0);
        assert!(graph.is_dirty(doubled));
        assert_eq!(graph.read(doubled), 10.0);
        assert_eq!(graph.evaluation_count(doubled), 2);
    }

    #[test]
    fn invalidation_reaches_transitive_dependents_only() {
        let mut graph = ReactiveGraph::new();
        let a = graph.signal(1_i64);
        let b = graph.signal(100_i64);
        let plus_one = graph.memo(move |scope| scope.get(a) + 1);
        let chained = graph.memo(move |scope| scope.read(plus_one) * 10);
        let unrelated = graph.memo(move |scope| scope.get(b));

        assert_eq!(graph.read(chained), 20);
        assert_eq!(graph.read(unrelated), 100);

        graph.set(a, 4);
        assert!(graph.is_dirty(plus_one));
        assert!(graph.is_dirty(chained));
        assert!(!graph.is_dirty(unrelated));
        assert_eq!(graph.read(chained), 50);
        assert_eq!(graph.evaluation_count(unrelated), 1);
    }

    #[test]
    fn stale_dependencies_are_dropped_on_reevaluation() {
        let mut graph = ReactiveGraph::new();
        let use_left = graph.signal(true);
        let left = graph.signal(1_u32);
        let right = graph.signal(2_u32);
        let pick = graph.memo(move |scope| {
            if scope.get(use_left) {
                scope.get(left)
            } else {
                scope.get(right)
            }
        });

        assert_eq!(graph.read(pick), 1);
        assert_eq!(graph.dependencies(pick.id()), vec![use_left.id(), left.id()]);

        graph.set(use_left, false);
        assert_eq!(graph.read(pick), 2);
        assert!(graph.dependents(left.id()).is_empty());

        graph.set(left, 7);
        assert!(!graph.is_dirty(pick), "no longer read, must not invalidate");

        graph.set(right, 9);
        assert_eq!(graph.read(pick), 9);
    }

    #[test]
    fn untracked_scope_reads_without_recording() {
        let mut graph = ReactiveGraph::new();
        let value = graph.signal(3_u8);
        let doubled = graph.memo(move |scope| scope.get(value) * 2);
        let read = graph.untracked(|scope| scope.read(doubled) + scope.get(value));
        assert_eq!(read, 9);
        assert_eq!(graph.dependents(doubled.id()), Vec::new());
    }

    #[test]
    fn release_keeps_memos_read_from_outside() {
        let mut graph = ReactiveGraph::new();
        let base = graph.signal(1_u32);
        let inner = graph.memo(move |scope| scope.get(base) + 1);
        let private = graph.memo(move |scope| scope.read(inner) * 2);
        let outside = graph.memo(move |scope| scope.read(inner) * 10);
        assert_eq!(graph.read(private), 4);
        assert_eq!(graph.read(outside), 20);

        assert_eq!(graph.release(&[base.id(), inner.id(), private.id()]), 1);
        assert!(graph.dependencies(private.id()).is_empty());
        assert_eq!(graph.dependents(inner.id()), vec![outside.id()]);

        graph.set(base, 4);
        assert_eq!(graph.read(outside), 50);
        assert!(graph.is_dirty(private));
        assert_eq!(graph.read(private), 10);
        assert_eq!(graph.dependents(inner.id()), vec![private.id(), outside.id()]);
    }

    #[test]
    #[should_panic(expected = "reactive cycle")]
    fn self_referencing_memo_panics() {
        let mut graph = ReactiveGraph::new();
        let slot = graph.signal(None::<super::Memo<u32>>);
        let looping = graph.memo(move |scope| match scope.get(slot) {
            Some(memo) => scope.read(memo),
            None => 0,
        });
        graph.set(slot, Some(looping));
        graph.read(looping);
    }
}
