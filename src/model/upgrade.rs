use tracing::debug;

use crate::core::{ConfigError, Resource, Simulation};
use crate::decimal::Decimal;
use crate::reactive::{Memo, ReactiveGraph, Signal};

use super::layer::LayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpgradeId(usize);

impl UpgradeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeOptions {
    pub key: String,
    pub cost: Decimal,
    pub resource: Resource,
}

impl UpgradeOptions {
    pub fn new(key: impl Into<String>, cost: impl Into<Decimal>, resource: Resource) -> Self {
        Self {
            key: key.into(),
            cost: cost.into(),
            resource,
        }
    }
}

/// One-shot purchase.
#[derive(Debug)]
pub struct Upgrade {
    key: String,
    owner: LayerId,
    cost: Decimal,
    resource: Resource,
    purchased: Signal<bool>,
    can_purchase: Memo<bool>,
}

impl Upgrade {
    fn new(graph: &mut ReactiveGraph, owner: LayerId, key: String, cost: Decimal, resource: Resource) -> Self {
        let purchased = graph.signal(false);
        let can_purchase = graph.memo(move |scope| !scope.get(purchased) && scope.resource(resource) >= cost);
        Self {
            key,
            owner,
            cost,
            resource,
            purchased,
            can_purchase,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner(&self) -> LayerId {
        self.owner
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn purchased_signal(&self) -> Signal<bool> {
        self.purchased
    }

    pub fn can_purchase_memo(&self) -> Memo<bool> {
        self.can_purchase
    }
}

impl Simulation {
    pub fn upgrade(&self, id: UpgradeId) -> &Upgrade {
        &self.upgrades[id.0]
    }

    pub fn upgrade_by_key(&self, key: &str) -> Option<UpgradeId> {
        self.upgrades
            .iter()
            .position(|upgrade| upgrade.key == key && self.is_live(upgrade.owner))
            .map(UpgradeId)
    }

    pub(crate) fn push_upgrade(
        &mut self,
        owner: LayerId,
        key: String,
        options: UpgradeOptions,
    ) -> Result<UpgradeId, ConfigError> {
        if !(options.cost.is_finite() && options.cost > Decimal::ZERO) {
            return Err(ConfigError::NonPositiveCost(options.cost));
        }
        if !self.resources.contains(options.resource) {
            return Err(ConfigError::UnknownResource(options.resource.index()));
        }
        let id = UpgradeId(self.upgrades.len());
        let upgrade = Upgrade::new(&mut self.graph, owner, key, options.cost, options.resource);
        self.upgrades.push(upgrade);
        Ok(id)
    }

    pub fn upgrade_purchased(&self, id: UpgradeId) -> bool {
        self.graph.get(self.upgrade(id).purchased)
    }

    pub fn can_purchase_upgrade(&self, id: UpgradeId) -> bool {
        self.graph.read(self.upgrade(id).can_purchase)
    }

    /// Deducts the cost once. Owned or unaffordable upgrades are left alone.
    pub fn purchase_upgrade(&mut self, id: UpgradeId) -> bool {
        let upgrade = &self.upgrades[id.0];
        if self.graph.get(upgrade.purchased) {
            return false;
        }
        let (purchased, resource, cost) = (upgrade.purchased, upgrade.resource, upgrade.cost);
        if !self.resources.spend(&mut self.graph, resource, cost) {
            return false;
        }
        self.graph.set(purchased, true);
        debug!(upgrade = %self.upgrades[id.0].key, "upgrade purchased");
        true
    }

    pub(crate) fn set_upgrade_purchased(&mut self, id: UpgradeId, purchased: bool) {
        let signal = self.upgrades[id.0].purchased;
        self.graph.set(signal, purchased);
    }
}

#[cfg(test)]
mod tests {
    use super::UpgradeOptions;
    use crate::core::Simulation;
    use crate::decimal::Decimal;

    #[test]
    fn upgrade_is_bought_once() {
        let mut sim = Simulation::new();
        let (_, (ultrasound, pitch)) = sim
            .create_layer("sound", "Sound", |layer| {
                let ultrasound = layer.resource("ultrasound", "Ultrasound")?;
                let pitch = layer.upgrade(UpgradeOptions::new("pitch", 100.0, ultrasound))?;
                Ok((ultrasound, pitch))
            })
            .expect("layer");

        sim.set_value(ultrasound, 99.0);
        assert!(!sim.can_purchase_upgrade(pitch));
        assert!(!sim.purchase_upgrade(pitch));

        sim.set_value(ultrasound, 250.0);
        assert!(sim.can_purchase_upgrade(pitch));
        assert!(sim.purchase_upgrade(pitch));
        assert!(sim.upgrade_purchased(pitch));
        assert_eq!(sim.value(ultrasound), Decimal::from_f64(150.0));

        assert!(!sim.can_purchase_upgrade(pitch));
        assert!(!sim.purchase_upgrade(pitch));
        assert_eq!(sim.value(ultrasound), Decimal::from_f64(150.0));
    }
}
