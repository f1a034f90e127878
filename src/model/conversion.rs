use tracing::debug;

use crate::core::{Resource, Simulation};
use crate::decimal::Decimal;
use crate::reactive::{Memo, ReactiveGraph};

use super::layer::LayerId;
use super::scaling::{Scaling, round_cost};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConversionId(usize);

impl ConversionId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// Every convert adds the full current gain to the gain resource.
    Cumulative,
    /// The gain resource tracks the total reachable amount; converting only
    /// adds the difference. Without `buy_max` it rises one unit at a time.
    Independent { buy_max: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionOptions {
    pub scaling: Scaling,
    pub base: Resource,
    pub gain: Resource,
    pub kind: ConversionKind,
    pub round_up_cost: bool,
}

impl ConversionOptions {
    pub fn new(scaling: Scaling, base: Resource, gain: Resource) -> Self {
        Self {
            scaling,
            base,
            gain,
            kind: ConversionKind::Cumulative,
            round_up_cost: false,
        }
    }

    pub fn independent(mut self, buy_max: bool) -> Self {
        self.kind = ConversionKind::Independent { buy_max };
        self
    }

    pub fn round_up_cost(mut self) -> Self {
        self.round_up_cost = true;
        self
    }
}

/// Couples a scaling formula to a base and a gain resource.
///
/// The base resource is only read: converting never deducts it. A cumulative
/// conversion can therefore be repeated for the same gain again and again.
#[derive(Debug)]
pub struct Conversion {
    options: ConversionOptions,
    owner: LayerId,
    current_gain: Memo<Decimal>,
    actual_gain: Memo<Decimal>,
    next_cost: Memo<Decimal>,
}

impl Conversion {
    pub(crate) fn new(graph: &mut ReactiveGraph, owner: LayerId, options: ConversionOptions) -> Self {
        let ConversionOptions {
            scaling,
            base,
            gain,
            kind,
            round_up_cost,
        } = options;

        let current_gain = graph.memo(move |scope| {
            let reachable = scaling.resolve(scope).whole_gain(scope.resource(base));
            match kind {
                ConversionKind::Cumulative => reachable,
                ConversionKind::Independent { buy_max } => {
                    let owned = scope.resource(gain);
                    let target = reachable.max(owned);
                    if buy_max {
                        target
                    } else {
                        target.min(owned + Decimal::ONE)
                    }
                }
            }
        });

        let actual_gain = graph.memo(move |scope| {
            let current = scope.read(current_gain);
            match kind {
                ConversionKind::Cumulative => current,
                ConversionKind::Independent { .. } => {
                    (current - scope.resource(gain)).max(Decimal::ZERO)
                }
            }
        });

        let next_cost = graph.memo(move |scope| {
            let target = scope.resource(gain).floor() + Decimal::ONE;
            round_cost(scaling.resolve(scope).to_input(target), round_up_cost)
        });

        Self {
            options,
            owner,
            current_gain,
            actual_gain,
            next_cost,
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn owner(&self) -> LayerId {
        self.owner
    }

    pub fn current_gain_memo(&self) -> Memo<Decimal> {
        self.current_gain
    }

    pub fn actual_gain_memo(&self) -> Memo<Decimal> {
        self.actual_gain
    }

    pub fn next_cost_memo(&self) -> Memo<Decimal> {
        self.next_cost
    }
}

impl Simulation {
    pub fn conversion(&self, id: ConversionId) -> &Conversion {
        &self.conversions[id.0]
    }

    pub(crate) fn push_conversion(&mut self, owner: LayerId, options: ConversionOptions) -> ConversionId {
        let id = ConversionId(self.conversions.len());
        let conversion = Conversion::new(&mut self.graph, owner, options);
        self.conversions.push(conversion);
        id
    }

    /// Integral gain reachable from the current base amount.
    pub fn current_gain(&self, id: ConversionId) -> Decimal {
        self.graph.read(self.conversion(id).current_gain)
    }

    /// What [`Simulation::convert`] would add right now.
    pub fn actual_gain(&self, id: ConversionId) -> Decimal {
        self.graph.read(self.conversion(id).actual_gain)
    }

    /// Base amount needed for the next whole unit of the gain resource.
    pub fn next_cost(&self, id: ConversionId) -> Decimal {
        self.graph.read(self.conversion(id).next_cost)
    }

    pub fn cost_to_reach(&self, id: ConversionId, target: Decimal) -> Decimal {
        let options = self.conversion(id).options;
        let formula = self.graph.untracked(|scope| options.scaling.resolve(scope));
        round_cost(formula.to_input(target), options.round_up_cost)
    }

    /// Base amount at which a single convert yields `count` more whole units.
    ///
    /// Independent conversions count on top of the units already owned;
    /// cumulative ones pay out their whole reachable gain every time.
    pub fn bulk_conversion_cost(&self, id: ConversionId, count: Decimal) -> Decimal {
        let options = self.conversion(id).options;
        let owned = match options.kind {
            ConversionKind::Cumulative => Decimal::ZERO,
            ConversionKind::Independent { .. } => self.value(options.gain),
        };
        let formula = self.graph.untracked(|scope| options.scaling.resolve(scope));
        round_cost(formula.bulk_input(owned, count), options.round_up_cost)
    }

    pub fn can_convert(&self, id: ConversionId) -> bool {
        self.actual_gain(id) > Decimal::ZERO
    }

    /// Applies the conversion and returns the amount gained.
    pub fn convert(&mut self, id: ConversionId) -> Decimal {
        let gained = self.actual_gain(id);
        if !(gained > Decimal::ZERO) {
            return Decimal::ZERO;
        }
        let options = self.conversion(id).options;
        match options.kind {
            ConversionKind::Cumulative => {
                self.add_value(options.gain, gained);
            }
            ConversionKind::Independent { .. } => {
                let total = self.current_gain(id);
                self.set_value(options.gain, total);
            }
        }
        debug!(conversion = id.0, %gained, "converted");
        gained
    }
}
