use std::collections::HashMap;

use tracing::{debug, warn};

use crate::decimal::Decimal;
use crate::model::LayerId;
use crate::reactive::{ReactiveGraph, Scope, Signal};

/// Handle to a named, non-negative quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resource {
    index: usize,
    cell: Signal<Decimal>,
}

impl Resource {
    pub fn index(self) -> usize {
        self.index
    }

    pub fn signal(self) -> Signal<Decimal> {
        self.cell
    }
}

/// Historical maximum of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BestTracker {
    resource: Resource,
    best: Signal<Decimal>,
}

impl BestTracker {
    pub fn resource(self) -> Resource {
        self.resource
    }

    pub fn signal(self) -> Signal<Decimal> {
        self.best
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
    pub key: String,
    pub display_name: String,
    pub initial: Decimal,
    pub owner: LayerId,
}

#[derive(Debug)]
struct ResourceSlot {
    info: ResourceInfo,
    resource: Resource,
    best: Option<BestTracker>,
}

#[derive(Debug, Default)]
pub struct ResourceStore {
    slots: Vec<ResourceSlot>,
    by_key: HashMap<String, usize>,
}

impl ResourceStore {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, resource: Resource) -> bool {
        self.slots
            .get(resource.index)
            .is_some_and(|slot| slot.resource == resource)
    }

    pub fn info(&self, resource: Resource) -> Option<&ResourceInfo> {
        self.slot(resource).map(|slot| &slot.info)
    }

    pub fn by_key(&self, key: &str) -> Option<Resource> {
        self.by_key.get(key).map(|&index| self.slots[index].resource)
    }

    pub fn best_tracker(&self, resource: Resource) -> Option<BestTracker> {
        self.slot(resource).and_then(|slot| slot.best)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, &ResourceInfo)> {
        self.slots.iter().map(|slot| (slot.resource, &slot.info))
    }

    pub(crate) fn register(&mut self, graph: &mut ReactiveGraph, info: ResourceInfo) -> Resource {
        let initial = info.initial.sanitized();
        let resource = Resource {
            index: self.slots.len(),
            cell: graph.signal(initial),
        };
        self.by_key.insert(info.key.clone(), resource.index);
        self.slots.push(ResourceSlot {
            info: ResourceInfo { initial, ..info },
            resource,
            best: None,
        });
        resource
    }

    /// Attaches a best tracker, seeded with the current value.
    pub(crate) fn track_best(
        &mut self,
        graph: &mut ReactiveGraph,
        resource: Resource,
    ) -> Option<BestTracker> {
        let current = graph.get(resource.cell);
        let slot = self.slots.get_mut(resource.index)?;
        if slot.best.is_some() {
            return None;
        }
        let tracker = BestTracker {
            resource,
            best: graph.signal(current),
        };
        slot.best = Some(tracker);
        Some(tracker)
    }

    pub fn value(&self, graph: &ReactiveGraph, resource: Resource) -> Decimal {
        graph.get(resource.cell)
    }

    /// Writes a clamped value and raises the best tracker when exceeded.
    pub(crate) fn write(
        &self,
        graph: &mut ReactiveGraph,
        resource: Resource,
        value: Decimal,
    ) -> Decimal {
        let clamped = value.sanitized();
        if clamped != value {
            if value.is_finite() {
                debug!(resource = resource.index, %value, "clamping negative resource value to zero");
            } else {
                warn!(resource = resource.index, %value, "clamping non-finite resource value to zero");
            }
        }
        graph.set(resource.cell, clamped);

        if let Some(tracker) = self.best_tracker(resource)
            && clamped > graph.get(tracker.best)
        {
            graph.set(tracker.best, clamped);
        }
        clamped
    }

    pub(crate) fn add(&self, graph: &mut ReactiveGraph, resource: Resource, amount: Decimal) -> Decimal {
        if amount.is_zero() {
            return Decimal::ZERO;
        }
        let previous = graph.get(resource.cell);
        let next = self.write(graph, resource, previous + amount);
        next - previous
    }

    /// Deducts `amount` when the resource covers it; leaves it untouched otherwise.
    pub(crate) fn spend(&self, graph: &mut ReactiveGraph, resource: Resource, amount: Decimal) -> bool {
        let current = graph.get(resource.cell);
        if current < amount {
            return false;
        }
        self.write(graph, resource, current - amount);
        true
    }

    pub(crate) fn reset(&self, graph: &mut ReactiveGraph, resource: Resource) {
        if let Some(slot) = self.slot(resource) {
            graph.set(resource.cell, slot.info.initial);
        }
    }

    /// Lowers a best tracker back to the tracked resource's current value.
    pub(crate) fn reset_best(&self, graph: &mut ReactiveGraph, tracker: BestTracker) {
        let current = graph.get(tracker.resource.cell);
        graph.set(tracker.best, current);
    }

    pub(crate) fn restore_best(&self, graph: &mut ReactiveGraph, tracker: BestTracker, best: Decimal) {
        let current = graph.get(tracker.resource.cell);
        graph.set(tracker.best, best.sanitized().max(current));
    }

    /// Drops the key lookups of every resource owned by `owner`.
    pub(crate) fn forget_owner(&mut self, owner: LayerId) {
        let slots = &self.slots;
        self.by_key
            .retain(|_, index| slots[*index].info.owner != owner);
    }

    fn slot(&self, resource: Resource) -> Option<&ResourceSlot> {
        self.slots
            .get(resource.index)
            .filter(|slot| slot.resource == resource)
    }
}

impl Scope<'_> {
    pub fn resource(&self, resource: Resource) -> Decimal {
        self.get(resource.cell)
    }

    pub fn best(&self, tracker: BestTracker) -> Decimal {
        self.get(tracker.best)
    }
}

#[cfg(test)]
mod tests {
    use super::{ResourceInfo, ResourceStore};
    use crate::decimal::Decimal;
    use crate::model::LayerId;
    use crate::reactive::ReactiveGraph;

    fn info(key: &str) -> ResourceInfo {
        ResourceInfo {
            key: key.to_string(),
            display_name: key.to_string(),
            initial: Decimal::ZERO,
            owner: LayerId::from_index(0),
        }
    }

    #[test]
    fn writes_clamp_to_non_negative() {
        let mut graph = ReactiveGraph::new();
        let mut store = ResourceStore::default();
        let points = store.register(&mut graph, info("main.points"));

        store.write(&mut graph, points, Decimal::from_f64(-3.0));
        assert_eq!(store.value(&graph, points), Decimal::ZERO);
        store.write(&mut graph, points, Decimal::NAN);
        assert_eq!(store.value(&graph, points), Decimal::ZERO);
    }

    #[test]
    fn spend_is_all_or_nothing() {
        let mut graph = ReactiveGraph::new();
        let mut store = ResourceStore::default();
        let points = store.register(&mut graph, info("main.points"));
        store.write(&mut graph, points, Decimal::from_f64(50.0));

        assert!(!store.spend(&mut graph, points, Decimal::from_f64(100.0)));
        assert_eq!(store.value(&graph, points), Decimal::from_f64(50.0));
        assert!(store.spend(&mut graph, points, Decimal::from_f64(20.0)));
        assert_eq!(store.value(&graph, points), Decimal::from_f64(30.0));
    }

    #[test]
    fn best_tracker_only_rises() {
        let mut graph = ReactiveGraph::new();
        let mut store = ResourceStore::default();
        let points = store.register(&mut graph, info("main.points"));
        let best = store.track_best(&mut graph, points).expect("first tracker");
        assert!(store.track_best(&mut graph, points).is_none());

        for value in [5.0, 42.0, 3.0, 0.0, 41.0] {
            store.write(&mut graph, points, Decimal::from_f64(value));
            assert!(graph.get(best.signal()) >= store.value(&graph, points));
        }
        assert_eq!(graph.get(best.signal()), Decimal::from_f64(42.0));
        assert_eq!(store.by_key("main.points"), Some(points));
    }
}
