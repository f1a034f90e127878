use tracing::{info, warn};

use crate::core::{BestTracker, ConfigError, Resource, ResourceInfo, Simulation, SubscriptionId, TickCallback, TickHandler, UPDATE_EVENT};
use crate::decimal::Decimal;
use crate::reactive::{Memo, NodeId, Scope};

use super::buyable::{BuyableId, MultiBuyableOptions};
use super::conversion::{ConversionId, ConversionOptions};
use super::effect::{EffectId, EffectOptions};
use super::reset::{ResetId, ResetTarget};
use super::tree::{TreeNode, TreeNodeOptions};
use super::upgrade::{UpgradeId, UpgradeOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(usize);

impl LayerId {
    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// Bookkeeping for one game subsystem and everything it registered.
#[derive(Debug)]
pub struct Layer {
    key: String,
    name: String,
    removed: bool,
    nested: Vec<LayerId>,
    conversions: Vec<ConversionId>,
    buyables: Vec<BuyableId>,
    upgrades: Vec<UpgradeId>,
    effects: Vec<EffectId>,
    subscriptions: Vec<SubscriptionId>,
    reset: Option<ResetId>,
    tree_node: Option<TreeNode>,
    nodes: Vec<NodeId>,
}

impl Layer {
    fn new(key: &str, name: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            removed: false,
            nested: Vec::new(),
            conversions: Vec::new(),
            buyables: Vec::new(),
            upgrades: Vec::new(),
            effects: Vec::new(),
            subscriptions: Vec::new(),
            reset: None,
            tree_node: None,
            nodes: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nested(&self) -> &[LayerId] {
        &self.nested
    }

    pub fn conversions(&self) -> &[ConversionId] {
        &self.conversions
    }

    pub fn buyables(&self) -> &[BuyableId] {
        &self.buyables
    }

    pub fn upgrades(&self) -> &[UpgradeId] {
        &self.upgrades
    }

    pub fn effects(&self) -> &[EffectId] {
        &self.effects
    }

    pub fn subscriptions(&self) -> &[SubscriptionId] {
        &self.subscriptions
    }

    pub fn reset(&self) -> Option<ResetId> {
        self.reset
    }

    pub fn tree_node(&self) -> Option<&TreeNode> {
        self.tree_node.as_ref()
    }

    pub fn color(&self) -> Option<&str> {
        self.tree_node.as_ref().map(|node| node.color.as_str())
    }
}

/// Registration handle passed to the closure of [`Simulation::create_layer`].
///
/// Keys given to the builder are local to the layer; the stored key is
/// `"<layer>.<key>"`.
pub struct LayerBuilder<'a> {
    sim: &'a mut Simulation,
    layer: LayerId,
}

impl LayerBuilder<'_> {
    pub fn id(&self) -> LayerId {
        self.layer
    }

    pub fn key(&self) -> &str {
        self.sim.layers[self.layer.0].key()
    }

    /// Read access to everything registered so far, including other layers.
    pub fn simulation(&self) -> &Simulation {
        self.sim
    }

    fn qualified(&self, key: &str) -> String {
        format!("{}.{key}", self.key())
    }

    fn duplicate(&self, key: &str) -> ConfigError {
        ConfigError::DuplicateKey {
            layer: self.key().to_string(),
            key: key.to_string(),
        }
    }

    fn ensure_owned(&self, resource: Resource) -> Result<(), ConfigError> {
        let info = self
            .sim
            .resources
            .info(resource)
            .ok_or(ConfigError::UnknownResource(resource.index()))?;
        if info.owner != self.layer {
            return Err(ConfigError::ForeignResource {
                layer: self.key().to_string(),
                key: info.key.clone(),
            });
        }
        Ok(())
    }

    fn ensure_known(&self, resource: Resource) -> Result<(), ConfigError> {
        if self.sim.resources.contains(resource) {
            Ok(())
        } else {
            Err(ConfigError::UnknownResource(resource.index()))
        }
    }

    pub fn resource(&mut self, key: &str, display_name: &str) -> Result<Resource, ConfigError> {
        self.resource_with_initial(key, display_name, Decimal::ZERO)
    }

    /// Registers a resource that resets to `initial` instead of zero.
    pub fn resource_with_initial(
        &mut self,
        key: &str,
        display_name: &str,
        initial: impl Into<Decimal>,
    ) -> Result<Resource, ConfigError> {
        let qualified = self.qualified(key);
        if self.sim.resources.by_key(&qualified).is_some() {
            return Err(self.duplicate(key));
        }
        let info = ResourceInfo {
            key: qualified,
            display_name: display_name.to_string(),
            initial: initial.into(),
            owner: self.layer,
        };
        Ok(self.sim.resources.register(&mut self.sim.graph, info))
    }

    pub fn track_best(&mut self, resource: Resource) -> Result<BestTracker, ConfigError> {
        self.ensure_owned(resource)?;
        self.sim
            .resources
            .track_best(&mut self.sim.graph, resource)
            .ok_or_else(|| {
                let key = self
                    .sim
                    .resources
                    .info(resource)
                    .map(|info| info.key.clone())
                    .unwrap_or_default();
                ConfigError::DuplicateBestTracker(key)
            })
    }

    pub fn memo<T, F>(&mut self, compute: F) -> Memo<T>
    where
        T: Clone + 'static,
        F: Fn(&Scope<'_>) -> T + 'static,
    {
        self.sim.graph.memo(compute)
    }

    /// The gain resource must belong to this layer; the base may be anyone's.
    pub fn conversion(&mut self, options: ConversionOptions) -> Result<ConversionId, ConfigError> {
        options.scaling.validate()?;
        self.ensure_known(options.base)?;
        self.ensure_owned(options.gain)?;
        let id = self.sim.push_conversion(self.layer, options);
        self.sim.layers[self.layer.0].conversions.push(id);
        Ok(id)
    }

    /// Cost sets may draw on resources of other layers.
    pub fn multi_buyable(&mut self, options: MultiBuyableOptions) -> Result<BuyableId, ConfigError> {
        let qualified = self.qualified(&options.key);
        if self.sim.buyable_by_key(&qualified).is_some() {
            return Err(self.duplicate(&options.key));
        }
        let id = self.sim.push_buyable(self.layer, qualified, options)?;
        self.sim.layers[self.layer.0].buyables.push(id);
        Ok(id)
    }

    pub fn upgrade(&mut self, options: UpgradeOptions) -> Result<UpgradeId, ConfigError> {
        let qualified = self.qualified(&options.key);
        if self.sim.upgrade_by_key(&qualified).is_some() {
            return Err(self.duplicate(&options.key));
        }
        let id = self.sim.push_upgrade(self.layer, qualified, options)?;
        self.sim.layers[self.layer.0].upgrades.push(id);
        Ok(id)
    }

    /// Registers a named effect; purchase effects must describe a purchase of
    /// this layer.
    pub fn effect(&mut self, options: EffectOptions) -> Result<EffectId, ConfigError> {
        let qualified = self.qualified(&options.key);
        if self.sim.effect_by_key(&qualified).is_some() {
            return Err(self.duplicate(&options.key));
        }
        let id = self.sim.push_effect(self.layer, qualified, options)?;
        self.sim.layers[self.layer.0].effects.push(id);
        Ok(id)
    }

    /// `target += rate * delta` on every update tick while the layer lives.
    pub fn accrue(&mut self, target: Resource, rate: Memo<Decimal>) -> Result<SubscriptionId, ConfigError> {
        self.ensure_owned(target)?;
        let id = self.sim.bus.subscribe(
            UPDATE_EVENT,
            Some(self.layer),
            TickHandler::Accrue { target, rate },
        );
        self.sim.layers[self.layer.0].subscriptions.push(id);
        Ok(id)
    }

    pub fn on_update(&mut self, callback: TickCallback) -> SubscriptionId {
        let id = self
            .sim
            .bus
            .subscribe(UPDATE_EVENT, Some(self.layer), TickHandler::Custom(callback));
        self.sim.layers[self.layer.0].subscriptions.push(id);
        id
    }

    /// Makes a reset of this layer also reset `child`.
    pub fn nest(&mut self, child: LayerId) -> Result<(), ConfigError> {
        if child == self.layer {
            return Err(ConfigError::SelfNesting(self.key().to_string()));
        }
        if self.sim.layer(child).is_none() {
            return Err(ConfigError::UnknownLayer(child.0));
        }
        let layer = &mut self.sim.layers[self.layer.0];
        if !layer.nested.contains(&child) {
            layer.nested.push(child);
        }
        Ok(())
    }

    /// Declares the reset the layer's tree node triggers.
    pub fn reset_targets(&mut self, targets: Vec<ResetTarget>) -> Result<ResetId, ConfigError> {
        let id = self.sim.push_reset(Some(self.layer), targets)?;
        self.sim.layers[self.layer.0].reset = Some(id);
        Ok(id)
    }

    pub fn tree_node(&mut self, options: TreeNodeOptions) -> Result<(), ConfigError> {
        if let Some(reset) = options.reset
            && reset.index() >= self.sim.resets.len()
        {
            return Err(ConfigError::UnknownReset(reset.index()));
        }
        self.sim.layers[self.layer.0].tree_node = Some(TreeNode::from(options));
        Ok(())
    }
}

impl Simulation {
    /// Reserves a layer and lets `build` register its content. A failed
    /// build tears down whatever was registered.
    pub fn create_layer<R>(
        &mut self,
        key: &str,
        name: &str,
        build: impl FnOnce(&mut LayerBuilder<'_>) -> Result<R, ConfigError>,
    ) -> Result<(LayerId, R), ConfigError> {
        if self.layer_by_key(key).is_some() {
            return Err(ConfigError::DuplicateLayer(key.to_string()));
        }
        let id = LayerId(self.layers.len());
        self.layers.push(Layer::new(key, name));

        match self.build_into(id, build) {
            Ok(value) => {
                info!(layer = key, "layer created");
                Ok((id, value))
            }
            Err(error) => {
                warn!(layer = key, %error, "layer construction failed");
                self.remove_layer(id);
                Err(error)
            }
        }
    }

    /// Reopens a live layer for further registrations, e.g. rates that read
    /// layers created after it. Whatever was registered before an error stays.
    pub fn extend_layer<R>(
        &mut self,
        id: LayerId,
        build: impl FnOnce(&mut LayerBuilder<'_>) -> Result<R, ConfigError>,
    ) -> Result<R, ConfigError> {
        if !self.is_live(id) {
            return Err(ConfigError::UnknownLayer(id.0));
        }
        self.build_into(id, build)
    }

    fn build_into<R>(
        &mut self,
        id: LayerId,
        build: impl FnOnce(&mut LayerBuilder<'_>) -> Result<R, ConfigError>,
    ) -> Result<R, ConfigError> {
        let first_node = self.graph.len();
        let mut builder = LayerBuilder {
            sim: self,
            layer: id,
        };
        let result = build(&mut builder);
        let created = self.graph.created_since(first_node);
        self.layers[id.0].nodes.extend(created);
        result
    }

    /// Unsubscribes the layer's tick handlers, frees its keys and detaches
    /// its memos from the graph. Handles into the removed layer stay valid
    /// but no longer resolve by key; their memos recompute on the next read.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(layer) = self.layers.get_mut(id.0) else {
            return false;
        };
        if layer.removed {
            return false;
        }
        layer.removed = true;
        let subscriptions = std::mem::take(&mut layer.subscriptions);
        let nodes = std::mem::take(&mut layer.nodes);
        for subscription in subscriptions {
            self.bus.unsubscribe(subscription);
        }
        let released = self.graph.release(&nodes);
        self.resources.forget_owner(id);
        for layer in &mut self.layers {
            layer.nested.retain(|&child| child != id);
        }
        info!(layer = %self.layers[id.0].key, released, "layer removed");
        true
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0).filter(|layer| !layer.removed)
    }

    pub fn layer_by_key(&self, key: &str) -> Option<LayerId> {
        self.layers
            .iter()
            .position(|layer| !layer.removed && layer.key == key)
            .map(LayerId)
    }

    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &Layer)> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| !layer.removed)
            .map(|(index, layer)| (LayerId(index), layer))
    }

    pub(crate) fn is_live(&self, id: LayerId) -> bool {
        self.layer(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::core::{ConfigError, Simulation};
    use crate::decimal::Decimal;
    use crate::model::{ConversionOptions, Scaling};

    #[test]
    fn keys_are_qualified_and_unique() {
        let mut sim = Simulation::new();
        let (layer, points) = sim
            .create_layer("main", "Main", |layer| layer.resource("points", "Points"))
            .expect("layer");
        assert_eq!(sim.resource("main.points"), Some(points));
        assert_eq!(sim.layer_by_key("main"), Some(layer));

        let duplicate = sim.create_layer("main", "Again", |_| Ok(()));
        assert_eq!(duplicate, Err(ConfigError::DuplicateLayer("main".to_string())));

        let clash = sim.create_layer("other", "Other", |layer| {
            layer.resource("x", "X")?;
            layer.resource("x", "X")
        });
        assert!(matches!(clash, Err(ConfigError::DuplicateKey { .. })));
    }

    #[test]
    fn failed_build_is_torn_down() {
        let mut sim = Simulation::new();
        let (_, foreign) = sim
            .create_layer("main", "Main", |layer| layer.resource("points", "Points"))
            .expect("layer");

        let result = sim.create_layer("sound", "Sound", |layer| {
            let sound = layer.resource("sound", "Sound")?;
            let rate = layer.memo(move |scope| scope.resource(sound));
            layer.accrue(sound, rate)?;
            // Accruing into another layer's resource is rejected.
            layer.accrue(foreign, rate)
        });
        assert!(matches!(result, Err(ConfigError::ForeignResource { .. })));
        assert_eq!(sim.resource("sound.sound"), None);
        assert_eq!(sim.layer_by_key("sound"), None);
        assert_eq!(sim.bus().subscriber_count("update"), 0);

        // The key is free again.
        assert!(sim
            .create_layer("sound", "Sound", |layer| layer.resource("sound", "Sound"))
            .is_ok());
    }

    #[test]
    fn conversion_gain_must_be_owned() {
        let mut sim = Simulation::new();
        let (_, particles) = sim
            .create_layer("main", "Main", |layer| layer.resource("particles", "Particles"))
            .expect("layer");
        let result = sim.create_layer("comb", "Combinators", |layer| {
            layer.conversion(ConversionOptions::new(
                Scaling::exponential(1e11, 4.0, 2.0),
                particles,
                particles,
            ))
        });
        assert!(matches!(result, Err(ConfigError::ForeignResource { .. })));
    }

    #[test]
    fn removing_a_layer_stops_its_accrual() {
        let mut sim = Simulation::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let (layer, sound) = sim
            .create_layer("sound", "Sound", |layer| {
                let sound = layer.resource_with_initial("sound", "Sound", 1.0)?;
                let rate = layer.memo(|_| Decimal::ONE);
                layer.accrue(sound, rate)?;
                layer.on_update(Box::new(move |_, _| counter.set(counter.get() + 1)));
                Ok(sound)
            })
            .expect("layer");

        sim.tick(1.0);
        assert_eq!(sim.value(sound), Decimal::from_f64(2.0));
        assert_eq!(sim.bus().subscriptions_of(layer).len(), 2);

        assert!(sim.remove_layer(layer));
        assert!(!sim.remove_layer(layer));
        sim.tick(1.0);
        assert_eq!(sim.value(sound), Decimal::from_f64(2.0));
        assert_eq!(calls.get(), 1);
        assert!(sim.layer(layer).is_none());
    }

    #[test]
    fn removed_layer_memos_stop_listening() {
        let mut sim = Simulation::new();
        let (_, particles) = sim
            .create_layer("main", "Main", |layer| layer.resource("particles", "Particles"))
            .expect("main");
        let (comb, conversion) = sim
            .create_layer("comb", "Combinators", |layer| {
                let combinators = layer.resource("combinators", "Particle Combinators")?;
                layer.conversion(ConversionOptions::new(
                    Scaling::exponential(1e11, 4.0, 2.0),
                    particles,
                    combinators,
                ))
            })
            .expect("comb");
        sim.set_value(particles, 2e11);
        assert_eq!(sim.current_gain(conversion), Decimal::ONE);
        let gain = sim.conversion(conversion).current_gain_memo();
        assert!(!sim.graph().dependencies(gain.id()).is_empty());

        assert!(!sim.graph().dependents(particles.signal().id()).is_empty());

        assert!(sim.remove_layer(comb));
        assert!(sim.graph().dependencies(gain.id()).is_empty());
        assert!(sim.graph().dependents(particles.signal().id()).is_empty());
        sim.set_value(particles, 1.6e13);
        // The handle still answers, recomputing from current state.
        assert_eq!(sim.current_gain(conversion), Decimal::from_f64(2.0));
    }

    #[test]
    fn extending_a_layer_registers_later_content() {
        let mut sim = Simulation::new();
        let (main, particles) = sim
            .create_layer("main", "Main", |layer| layer.resource("particles", "Particles"))
            .expect("main");
        let (_, bonus) = sim
            .create_layer("comb", "Combinators", |layer| {
                layer.resource_with_initial("combinators", "Particle Combinators", 3.0)
            })
            .expect("comb");

        sim.extend_layer(main, |layer| {
            let rate = layer.memo(move |scope| scope.resource(bonus));
            layer.accrue(particles, rate)
        })
        .expect("extend");
        sim.tick(2.0);
        assert_eq!(sim.value(particles), Decimal::from_f64(6.0));

        sim.remove_layer(main);
        let result = sim.extend_layer(main, |_| Ok(()));
        assert_eq!(result, Err(ConfigError::UnknownLayer(main.index())));
    }

    #[test]
    fn nesting_itself_is_rejected() {
        let mut sim = Simulation::new();
        let result = sim.create_layer("loop", "Loop", |layer| {
            let id = layer.id();
            layer.nest(id)
        });
        assert_eq!(result, Err(ConfigError::SelfNesting("loop".to_string())));
    }
}
