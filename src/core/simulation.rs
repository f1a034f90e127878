use tracing::{trace, warn};

use crate::decimal::Decimal;
use crate::model::{Conversion, Effect, Layer, LayerId, MultiBuyable, Reset, Upgrade};
use crate::reactive::{Memo, ReactiveGraph, Scope};

use super::resource_store::{BestTracker, Resource, ResourceInfo, ResourceStore};
use super::tick::{SubscriptionId, TickBus, TickCallback, TickHandler, UPDATE_EVENT};

/// Owner of every layer, resource and reactive cell of one game.
///
/// All mutation goes through `&mut Simulation`: player actions (convert,
/// purchase, reset) and tick delivery. Reactive reads only need `&self`.
#[derive(Default)]
pub struct Simulation {
    pub(crate) graph: ReactiveGraph,
    pub(crate) resources: ResourceStore,
    pub(crate) conversions: Vec<Conversion>,
    pub(crate) buyables: Vec<MultiBuyable>,
    pub(crate) upgrades: Vec<Upgrade>,
    pub(crate) effects: Vec<Effect>,
    pub(crate) resets: Vec<Reset>,
    pub(crate) layers: Vec<Layer>,
    pub(crate) bus: TickBus,
    pub paused: bool,
    pub tick_index: u64,
    pub elapsed_seconds: f64,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &ReactiveGraph {
        &self.graph
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    pub fn bus(&self) -> &TickBus {
        &self.bus
    }

    /// Evaluates `f` against the current state without recording dependencies.
    pub fn with_scope<R>(&self, f: impl FnOnce(&Scope<'_>) -> R) -> R {
        self.graph.untracked(f)
    }

    pub fn read<T: Clone + 'static>(&self, memo: Memo<T>) -> T {
        self.graph.read(memo)
    }

    pub fn resource(&self, key: &str) -> Option<Resource> {
        self.resources.by_key(key)
    }

    pub fn resource_info(&self, resource: Resource) -> Option<&ResourceInfo> {
        self.resources.info(resource)
    }

    pub fn value(&self, resource: Resource) -> Decimal {
        self.resources.value(&self.graph, resource)
    }

    pub fn best(&self, tracker: BestTracker) -> Decimal {
        self.graph.get(tracker.signal())
    }

    pub fn best_tracker(&self, resource: Resource) -> Option<BestTracker> {
        self.resources.best_tracker(resource)
    }

    /// Overwrites a resource, clamping to zero. Returns the stored value.
    pub fn set_value(&mut self, resource: Resource, value: impl Into<Decimal>) -> Decimal {
        self.resources.write(&mut self.graph, resource, value.into())
    }

    /// Adds to a resource and returns the change actually applied.
    pub fn add_value(&mut self, resource: Resource, amount: impl Into<Decimal>) -> Decimal {
        self.resources.add(&mut self.graph, resource, amount.into())
    }

    pub fn tick(&mut self, delta_seconds: f64) {
        if !delta_seconds.is_finite() || delta_seconds < 0.0 {
            warn!(delta_seconds, "ignoring invalid tick delta");
            return;
        }
        if self.paused {
            return;
        }

        self.tick_index += 1;
        self.elapsed_seconds += delta_seconds;
        self.publish(UPDATE_EVENT, delta_seconds);
    }

    /// Delivers `delta_seconds` to every subscriber of `event`, in
    /// registration order.
    pub fn publish(&mut self, event: &'static str, delta_seconds: f64) {
        let mut subscribers = self.bus.take(event);
        trace!(event, subscribers = subscribers.len(), delta_seconds, "publishing");

        for subscriber in &mut subscribers {
            if self.bus.is_cancelled(subscriber.id) {
                continue;
            }
            match &mut subscriber.handler {
                TickHandler::Accrue { target, rate } => {
                    let rate = self.graph.read(*rate);
                    self.add_value(*target, rate * delta_seconds);
                }
                TickHandler::Custom(callback) => callback(self, delta_seconds),
            }
        }

        self.bus.restore(event, subscribers);
    }

    /// Subscribes a callback that is not tied to any layer.
    pub fn on_update(&mut self, callback: TickCallback) -> SubscriptionId {
        self.bus
            .subscribe(UPDATE_EVENT, None, TickHandler::Custom(callback))
    }

    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.bus.unsubscribe(subscription)
    }

    pub(crate) fn layer_key(&self, layer: LayerId) -> String {
        self.layers
            .get(layer.index())
            .map(|entry| entry.key().to_string())
            .unwrap_or_default()
    }
}
