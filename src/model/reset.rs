use tracing::{debug, warn};

use crate::core::{BestTracker, ConfigError, Resource, Simulation};

use super::buyable::BuyableId;
use super::layer::LayerId;
use super::upgrade::UpgradeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResetId(usize);

impl ResetId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Something a reset can put back to its initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget {
    /// Owned resources, buyables and upgrades, then nested layers. Best
    /// trackers are left alone.
    Layer(LayerId),
    /// Back to the resource's initial value.
    Resource(Resource),
    /// Lowered to the tracked resource's current value.
    BestTracker(BestTracker),
    Buyable(BuyableId),
    Upgrade(UpgradeId),
    /// Runs another reset's targets in place.
    Reset(ResetId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reset {
    owner: Option<LayerId>,
    targets: Vec<ResetTarget>,
}

impl Reset {
    pub fn owner(&self) -> Option<LayerId> {
        self.owner
    }

    pub fn targets(&self) -> &[ResetTarget] {
        &self.targets
    }
}

impl Simulation {
    pub fn reset(&self, id: ResetId) -> &Reset {
        &self.resets[id.0]
    }

    /// Registers a reset that belongs to no layer.
    pub fn create_reset(&mut self, targets: Vec<ResetTarget>) -> Result<ResetId, ConfigError> {
        self.push_reset(None, targets)
    }

    pub(crate) fn push_reset(
        &mut self,
        owner: Option<LayerId>,
        targets: Vec<ResetTarget>,
    ) -> Result<ResetId, ConfigError> {
        for target in &targets {
            self.validate_target(*target)?;
        }
        let id = ResetId(self.resets.len());
        self.resets.push(Reset { owner, targets });
        Ok(id)
    }

    // Nested resets must already exist, so the target graph stays acyclic.
    fn validate_target(&self, target: ResetTarget) -> Result<(), ConfigError> {
        match target {
            ResetTarget::Layer(layer) => {
                if !self.is_live(layer) {
                    return Err(ConfigError::UnknownLayer(layer.index()));
                }
            }
            ResetTarget::Resource(resource) => {
                if !self.resources.contains(resource) {
                    return Err(ConfigError::UnknownResource(resource.index()));
                }
            }
            ResetTarget::BestTracker(tracker) => {
                if self.resources.best_tracker(tracker.resource()) != Some(tracker) {
                    return Err(ConfigError::UnknownResource(tracker.resource().index()));
                }
            }
            ResetTarget::Buyable(buyable) => {
                if buyable.index() >= self.buyables.len() {
                    return Err(ConfigError::UnknownBuyable(buyable.index()));
                }
            }
            ResetTarget::Upgrade(upgrade) => {
                if upgrade.index() >= self.upgrades.len() {
                    return Err(ConfigError::UnknownUpgrade(upgrade.index()));
                }
            }
            ResetTarget::Reset(reset) => {
                if reset.0 >= self.resets.len() {
                    return Err(ConfigError::UnknownReset(reset.0));
                }
            }
        }
        Ok(())
    }

    /// Restores every target, depth first and in order. Visibility is never
    /// consulted.
    pub fn trigger_reset(&mut self, id: ResetId) {
        debug!(reset = id.0, "triggering reset");
        let targets = self.resets[id.0].targets.clone();
        for target in targets {
            self.reset_target(target);
        }
    }

    pub fn reset_target(&mut self, target: ResetTarget) {
        match target {
            ResetTarget::Layer(layer) => self.reset_layer(layer),
            ResetTarget::Resource(resource) => self.resources.reset(&mut self.graph, resource),
            ResetTarget::BestTracker(tracker) => {
                self.resources.reset_best(&mut self.graph, tracker);
            }
            ResetTarget::Buyable(buyable) => self.reset_buyable(buyable),
            ResetTarget::Upgrade(upgrade) => self.set_upgrade_purchased(upgrade, false),
            ResetTarget::Reset(reset) => self.trigger_reset(reset),
        }
    }

    fn reset_layer(&mut self, id: LayerId) {
        let Some(layer) = self.layer(id) else {
            warn!(layer = id.index(), "skipping reset of a removed layer");
            return;
        };
        let buyables = layer.buyables().to_vec();
        let upgrades = layer.upgrades().to_vec();
        let nested = layer.nested().to_vec();
        let owned: Vec<Resource> = self
            .resources
            .iter()
            .filter(|(_, info)| info.owner == id)
            .map(|(resource, _)| resource)
            .collect();

        for resource in owned {
            self.resources.reset(&mut self.graph, resource);
        }
        for buyable in buyables {
            self.reset_buyable(buyable);
        }
        for upgrade in upgrades {
            self.set_upgrade_purchased(upgrade, false);
        }
        for child in nested {
            self.reset_layer(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResetTarget;
    use crate::core::{ConfigError, Simulation};
    use crate::decimal::Decimal;
    use crate::model::{CostSet, MultiBuyableOptions, UpgradeOptions};

    fn d(value: f64) -> Decimal {
        Decimal::from_f64(value)
    }

    #[test]
    fn layer_reset_spares_best_tracker() {
        let mut sim = Simulation::new();
        let (_, (sound, best, buyable, upgrade, reset)) = sim
            .create_layer("sound", "Sound", |layer| {
                let sound = layer.resource("sound", "Sound Particles")?;
                let best = layer.track_best(sound)?;
                let coins = layer.resource_with_initial("coins", "Coins", 10.0)?;
                let buyable = layer.multi_buyable(MultiBuyableOptions::new(
                    "echo",
                    vec![CostSet::flat(1.0, coins)],
                ))?;
                let upgrade = layer.upgrade(UpgradeOptions::new("pitch", 1.0, coins))?;
                let reset = layer.reset_targets(vec![ResetTarget::Layer(layer.id())])?;
                Ok((sound, best, buyable, upgrade, reset))
            })
            .expect("layer");

        sim.set_value(sound, 42.0);
        assert!(sim.purchase_bulk(buyable, 3.0));
        assert!(sim.purchase_upgrade(upgrade));
        assert_eq!(sim.buyable_amount(buyable), d(3.0));

        sim.trigger_reset(reset);
        assert_eq!(sim.value(sound), Decimal::ZERO);
        assert_eq!(sim.buyable_amount(buyable), Decimal::ZERO);
        assert!(!sim.upgrade_purchased(upgrade));
        assert_eq!(sim.best(best), d(42.0));
    }

    #[test]
    fn explicit_targets_and_nested_layers() {
        let mut sim = Simulation::new();
        let (inner, (points, best)) = sim
            .create_layer("inner", "Inner", |layer| {
                let points = layer.resource_with_initial("points", "Points", 10.0)?;
                let best = layer.track_best(points)?;
                Ok((points, best))
            })
            .expect("inner");
        let (_, (outer_reset, gems)) = sim
            .create_layer("outer", "Outer", |layer| {
                let gems = layer.resource("gems", "Gems")?;
                layer.nest(inner)?;
                let reset = layer.reset_targets(vec![ResetTarget::Layer(layer.id())])?;
                Ok((reset, gems))
            })
            .expect("outer");

        sim.set_value(points, 500.0);
        sim.set_value(gems, 3.0);
        sim.trigger_reset(outer_reset);
        assert_eq!(sim.value(points), d(10.0));
        assert_eq!(sim.value(gems), Decimal::ZERO);
        assert_eq!(sim.best(best), d(500.0));

        let wipe_best = sim
            .create_reset(vec![
                ResetTarget::Reset(outer_reset),
                ResetTarget::BestTracker(best),
            ])
            .expect("reset");
        sim.set_value(points, 20.0);
        sim.trigger_reset(wipe_best);
        assert_eq!(sim.best(best), d(10.0));
    }

    #[test]
    fn unknown_targets_are_rejected_at_construction() {
        let mut sim = Simulation::new();
        let (layer, _) = sim
            .create_layer("gone", "Gone", |layer| layer.resource("x", "X"))
            .expect("layer");
        sim.remove_layer(layer);
        assert_eq!(
            sim.create_reset(vec![ResetTarget::Layer(layer)]),
            Err(ConfigError::UnknownLayer(layer.index()))
        );
    }
}
