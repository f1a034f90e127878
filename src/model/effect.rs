use crate::core::{ConfigError, Simulation};
use crate::decimal::Decimal;
use crate::reactive::Memo;

use super::buyable::BuyableId;
use super::layer::LayerId;
use super::upgrade::UpgradeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(usize);

impl EffectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The purchase an effect describes, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectSubject {
    #[default]
    Layer,
    Upgrade(UpgradeId),
    Buyable(BuyableId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectOptions {
    pub key: String,
    pub title: String,
    pub value: Memo<Decimal>,
    pub subject: EffectSubject,
}

impl EffectOptions {
    pub fn new(key: impl Into<String>, value: Memo<Decimal>) -> Self {
        Self {
            key: key.into(),
            title: String::new(),
            value,
            subject: EffectSubject::Layer,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn upgrade(mut self, upgrade: UpgradeId) -> Self {
        self.subject = EffectSubject::Upgrade(upgrade);
        self
    }

    pub fn buyable(mut self, buyable: BuyableId) -> Self {
        self.subject = EffectSubject::Buyable(buyable);
        self
    }
}

/// A named derived bonus, e.g. a multiplier other rates read.
///
/// The value is computed whether or not the subject is owned; consumers gate
/// on the purchase themselves.
#[derive(Debug)]
pub struct Effect {
    key: String,
    title: String,
    owner: LayerId,
    subject: EffectSubject,
    value: Memo<Decimal>,
}

impl Effect {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display label; the key when no title was given.
    pub fn title(&self) -> &str {
        if self.title.is_empty() { &self.key } else { &self.title }
    }

    pub fn owner(&self) -> LayerId {
        self.owner
    }

    pub fn subject(&self) -> EffectSubject {
        self.subject
    }

    pub fn value_memo(&self) -> Memo<Decimal> {
        self.value
    }
}

impl Simulation {
    pub fn effect(&self, id: EffectId) -> &Effect {
        &self.effects[id.0]
    }

    pub fn effect_by_key(&self, key: &str) -> Option<EffectId> {
        self.effects
            .iter()
            .position(|effect| effect.key == key && self.is_live(effect.owner))
            .map(EffectId)
    }

    pub fn effect_value(&self, id: EffectId) -> Decimal {
        self.graph.read(self.effect(id).value)
    }

    pub fn upgrade_effect(&self, upgrade: UpgradeId) -> Option<EffectId> {
        self.effects
            .iter()
            .position(|effect| effect.subject == EffectSubject::Upgrade(upgrade))
            .map(EffectId)
    }

    pub fn buyable_effect(&self, buyable: BuyableId) -> Option<EffectId> {
        self.effects
            .iter()
            .position(|effect| effect.subject == EffectSubject::Buyable(buyable))
            .map(EffectId)
    }

    pub(crate) fn push_effect(
        &mut self,
        owner: LayerId,
        key: String,
        options: EffectOptions,
    ) -> Result<EffectId, ConfigError> {
        let subject_owner = match options.subject {
            EffectSubject::Layer => owner,
            EffectSubject::Upgrade(upgrade) => {
                if self.upgrade_effect(upgrade).is_some() {
                    return Err(ConfigError::DuplicateEffect(key));
                }
                self.upgrades
                    .get(upgrade.index())
                    .ok_or(ConfigError::UnknownUpgrade(upgrade.index()))?
                    .owner()
            }
            EffectSubject::Buyable(buyable) => {
                if self.buyable_effect(buyable).is_some() {
                    return Err(ConfigError::DuplicateEffect(key));
                }
                self.buyables
                    .get(buyable.index())
                    .ok_or(ConfigError::UnknownBuyable(buyable.index()))?
                    .owner()
            }
        };
        if subject_owner != owner {
            return Err(ConfigError::ForeignSubject(key));
        }
        let id = EffectId(self.effects.len());
        self.effects.push(Effect {
            key,
            title: options.title,
            owner,
            subject: options.subject,
            value: options.value,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::EffectOptions;
    use crate::core::{ConfigError, Simulation};
    use crate::decimal::Decimal;
    use crate::model::{CostSet, MultiBuyableOptions, UpgradeOptions};

    fn d(value: f64) -> Decimal {
        Decimal::from_f64(value)
    }

    #[test]
    fn effects_follow_their_inputs() {
        let mut sim = Simulation::new();
        let (_, (combinators, boost)) = sim
            .create_layer("comb", "Combinators", |layer| {
                let combinators = layer.resource("combinators", "Particle Combinators")?;
                let value = layer.memo(move |scope| scope.resource(combinators).sqrt() + Decimal::ONE);
                let boost = layer.effect(EffectOptions::new("main_boost", value).title("Particle gain"))?;
                Ok((combinators, boost))
            })
            .expect("layer");

        assert_eq!(sim.effect_by_key("comb.main_boost"), Some(boost));
        assert_eq!(sim.effect(boost).title(), "Particle gain");
        assert_eq!(sim.effect_value(boost), Decimal::ONE);
        sim.set_value(combinators, 9.0);
        assert_eq!(sim.effect_value(boost), d(4.0));
    }

    #[test]
    fn purchase_effects_are_linked_to_their_subject() {
        let mut sim = Simulation::new();
        let (_, (upgrade, buyable, pitch, spark)) = sim
            .create_layer("sound", "Sound", |layer| {
                let ultrasound = layer.resource("ultrasound", "Ultrasound")?;
                let upgrade = layer.upgrade(UpgradeOptions::new("pitch", 100.0, ultrasound))?;
                let buyable = layer.multi_buyable(MultiBuyableOptions::new(
                    "spark",
                    vec![CostSet::flat(10.0, ultrasound)],
                ))?;
                let amount = layer.simulation().buyable(buyable).amount_signal();
                let per_unit = layer.memo(move |scope| scope.get(amount) * 2.0 + Decimal::ONE);
                let flat = layer.memo(|_| d(1.5));
                let pitch = layer.effect(EffectOptions::new("pitch", flat).upgrade(upgrade))?;
                let spark = layer.effect(EffectOptions::new("spark", per_unit).buyable(buyable))?;
                Ok((upgrade, buyable, pitch, spark))
            })
            .expect("layer");

        assert_eq!(sim.upgrade_effect(upgrade), Some(pitch));
        assert_eq!(sim.buyable_effect(buyable), Some(spark));
        assert_eq!(sim.effect(spark).title(), "sound.spark");
        assert_eq!(sim.effect_value(spark), Decimal::ONE);
        sim.restore_buyable(buyable, d(3.0));
        assert_eq!(sim.effect_value(spark), d(7.0));
    }

    #[test]
    fn effects_cannot_describe_another_layers_purchase() {
        let mut sim = Simulation::new();
        let (_, upgrade) = sim
            .create_layer("sound", "Sound", |layer| {
                let ultrasound = layer.resource("ultrasound", "Ultrasound")?;
                layer.upgrade(UpgradeOptions::new("pitch", 100.0, ultrasound))
            })
            .expect("layer");

        let result = sim.create_layer("comb", "Combinators", |layer| {
            let value = layer.memo(|_| Decimal::ONE);
            layer.effect(EffectOptions::new("stolen", value).upgrade(upgrade))
        });
        assert_eq!(result, Err(ConfigError::ForeignSubject("comb.stolen".to_string())));

        let duplicate = sim.create_layer("air", "Air", |layer| {
            let value = layer.memo(|_| Decimal::ONE);
            layer.effect(EffectOptions::new("gust", value))?;
            layer.effect(EffectOptions::new("gust", value))
        });
        assert!(matches!(duplicate, Err(ConfigError::DuplicateKey { .. })));
    }
}
