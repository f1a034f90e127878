use std::collections::BTreeMap;

use tracing::debug;

use crate::core::{ConfigError, Resource, Simulation};
use crate::decimal::Decimal;
use crate::reactive::{Memo, ReactiveGraph, Scope, Signal};

use super::layer::LayerId;
use super::tree::VisibilityRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuyableId(usize);

impl BuyableId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How the price of one cost set grows with the amount already owned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CostScaling {
    #[default]
    Flat,
    /// The `n`-th unit costs `cost * ratio^n`.
    Geometric { ratio: Decimal },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostSet {
    pub cost: Decimal,
    pub resource: Resource,
    pub scaling: CostScaling,
}

impl CostSet {
    pub fn flat(cost: impl Into<Decimal>, resource: Resource) -> Self {
        Self {
            cost: cost.into(),
            resource,
            scaling: CostScaling::Flat,
        }
    }

    pub fn geometric(cost: impl Into<Decimal>, ratio: impl Into<Decimal>, resource: Resource) -> Self {
        Self {
            cost: cost.into(),
            resource,
            scaling: CostScaling::Geometric {
                ratio: ratio.into(),
            },
        }
    }

    /// Price of the next unit when `owned` units are held.
    pub fn cost_at(&self, owned: Decimal) -> Decimal {
        match self.scaling {
            CostScaling::Flat => self.cost,
            CostScaling::Geometric { ratio } => self.cost * ratio.pow(owned.sanitized()),
        }
    }

    /// Combined price of `count` more units on top of `owned`.
    pub fn bulk_cost(&self, owned: Decimal, count: Decimal) -> Decimal {
        let count = count.sanitized().floor();
        if count.is_zero() {
            return Decimal::ZERO;
        }
        match self.scaling {
            CostScaling::Flat => self.cost * count,
            CostScaling::Geometric { ratio } => {
                let first = self.cost_at(owned);
                first * (ratio.pow(count) - Decimal::ONE) / (ratio - Decimal::ONE)
            }
        }
    }

    /// Largest count whose bulk cost fits in `available`, ignoring other sets.
    pub fn max_affordable(&self, owned: Decimal, available: Decimal) -> Decimal {
        let available = available.sanitized();
        let first = self.cost_at(owned);
        if available < first {
            return Decimal::ZERO;
        }
        match self.scaling {
            CostScaling::Flat => (available / self.cost).floor(),
            CostScaling::Geometric { ratio } => {
                let scaled = available * (ratio - Decimal::ONE) / first + Decimal::ONE;
                let estimate = scaled.log(ratio).floor().sanitized();
                // The logarithm can land just below an exact boundary.
                if self.bulk_cost(owned, estimate + Decimal::ONE) <= available {
                    estimate + Decimal::ONE
                } else if self.bulk_cost(owned, estimate) > available {
                    (estimate - Decimal::ONE).max(Decimal::ZERO)
                } else {
                    estimate
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cost.is_finite() && self.cost > Decimal::ZERO) {
            return Err(ConfigError::NonPositiveCost(self.cost));
        }
        if let CostScaling::Geometric { ratio } = self.scaling
            && !(ratio.is_finite() && ratio > Decimal::ONE)
        {
            return Err(ConfigError::InvalidScaling(
                "geometric cost ratio must be greater than 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiBuyableOptions {
    pub key: String,
    pub cost_sets: Vec<CostSet>,
    pub visibility: VisibilityRule,
    pub purchase_limit: Option<Decimal>,
}

impl MultiBuyableOptions {
    pub fn new(key: impl Into<String>, cost_sets: Vec<CostSet>) -> Self {
        Self {
            key: key.into(),
            cost_sets,
            visibility: VisibilityRule::Always,
            purchase_limit: None,
        }
    }

    pub fn visibility(mut self, visibility: VisibilityRule) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn purchase_limit(mut self, limit: impl Into<Decimal>) -> Self {
        self.purchase_limit = Some(limit.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.cost_sets.is_empty() {
            return Err(ConfigError::EmptyCostSets(self.key.clone()));
        }
        for set in &self.cost_sets {
            set.validate()?;
        }
        if let Some(limit) = self.purchase_limit
            && !(limit.is_finite() && !limit.is_sign_negative())
        {
            return Err(ConfigError::InvalidScaling("purchase limit must be non-negative"));
        }
        Ok(())
    }
}

/// A repeatable purchase paid from one or more resources at once.
#[derive(Debug)]
pub struct MultiBuyable {
    key: String,
    owner: LayerId,
    cost_sets: Vec<CostSet>,
    visibility: VisibilityRule,
    purchase_limit: Option<Decimal>,
    amount: Signal<Decimal>,
    can_purchase: Memo<bool>,
}

impl MultiBuyable {
    fn new(graph: &mut ReactiveGraph, owner: LayerId, key: String, options: MultiBuyableOptions) -> Self {
        let amount = graph.signal(Decimal::ZERO);
        let sets = options.cost_sets.clone();
        let limit = options.purchase_limit;
        let can_purchase = graph.memo(move |scope| {
            let owned = scope.get(amount);
            below_limit(owned, limit, Decimal::ONE)
                && required(&sets, owned, Decimal::ONE)
                    .into_iter()
                    .all(|(resource, cost)| scope.resource(resource) >= cost)
        });
        Self {
            key,
            owner,
            cost_sets: options.cost_sets,
            visibility: options.visibility,
            purchase_limit: options.purchase_limit,
            amount,
            can_purchase,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner(&self) -> LayerId {
        self.owner
    }

    pub fn cost_sets(&self) -> &[CostSet] {
        &self.cost_sets
    }

    pub fn visibility(&self) -> &VisibilityRule {
        &self.visibility
    }

    pub fn purchase_limit(&self) -> Option<Decimal> {
        self.purchase_limit
    }

    pub fn amount_signal(&self) -> Signal<Decimal> {
        self.amount
    }

    pub fn can_purchase_memo(&self) -> Memo<bool> {
        self.can_purchase
    }
}

fn below_limit(owned: Decimal, limit: Option<Decimal>, count: Decimal) -> bool {
    limit.is_none_or(|limit| owned + count <= limit)
}

/// Totals per resource, so two sets drawing on one resource are checked
/// against their combined price.
fn required(sets: &[CostSet], owned: Decimal, count: Decimal) -> Vec<(Resource, Decimal)> {
    let mut totals: BTreeMap<usize, (Resource, Decimal)> = BTreeMap::new();
    for set in sets {
        let cost = set.bulk_cost(owned, count);
        totals
            .entry(set.resource.index())
            .and_modify(|(_, total)| *total += cost)
            .or_insert((set.resource, cost));
    }
    totals.into_values().collect()
}

fn affordable(scope: &Scope<'_>, sets: &[CostSet], owned: Decimal, count: Decimal) -> bool {
    required(sets, owned, count)
        .into_iter()
        .all(|(resource, cost)| scope.resource(resource) >= cost)
}

impl Simulation {
    pub fn buyable(&self, id: BuyableId) -> &MultiBuyable {
        &self.buyables[id.0]
    }

    pub fn buyable_by_key(&self, key: &str) -> Option<BuyableId> {
        self.buyables
            .iter()
            .position(|buyable| buyable.key == key && self.is_live(buyable.owner))
            .map(BuyableId)
    }

    pub(crate) fn push_buyable(
        &mut self,
        owner: LayerId,
        key: String,
        options: MultiBuyableOptions,
    ) -> Result<BuyableId, ConfigError> {
        options.validate()?;
        for set in &options.cost_sets {
            if !self.resources.contains(set.resource) {
                return Err(ConfigError::UnknownResource(set.resource.index()));
            }
        }
        let id = BuyableId(self.buyables.len());
        let buyable = MultiBuyable::new(&mut self.graph, owner, key, options);
        self.buyables.push(buyable);
        Ok(id)
    }

    pub fn buyable_amount(&self, id: BuyableId) -> Decimal {
        self.graph.get(self.buyable(id).amount)
    }

    pub fn can_purchase(&self, id: BuyableId) -> bool {
        self.graph.read(self.buyable(id).can_purchase)
    }

    /// Price of the next `count` units, per cost set.
    pub fn bulk_cost(&self, id: BuyableId, count: Decimal) -> Vec<(Resource, Decimal)> {
        let buyable = self.buyable(id);
        let owned = self.buyable_amount(id);
        buyable
            .cost_sets
            .iter()
            .map(|set| (set.resource, set.bulk_cost(owned, count)))
            .collect()
    }

    /// Most units that can be bought right now, honouring the purchase limit.
    pub fn max_affordable(&self, id: BuyableId) -> Decimal {
        let buyable = self.buyable(id);
        let owned = self.buyable_amount(id);
        self.graph.untracked(|scope| {
            let mut high = buyable
                .cost_sets
                .iter()
                .map(|set| set.max_affordable(owned, scope.resource(set.resource)))
                .fold(Decimal::INFINITY, Decimal::min);
            if let Some(limit) = buyable.purchase_limit {
                high = high.min((limit - owned).max(Decimal::ZERO).floor());
            }
            if !high.is_finite() {
                return Decimal::ZERO;
            }

            // Per-set bounds can overshoot when sets share a resource.
            let mut low = Decimal::ZERO;
            for _ in 0..128 {
                if affordable(scope, &buyable.cost_sets, owned, high) {
                    return high;
                }
                if high - low <= Decimal::ONE {
                    break;
                }
                let mid = ((low + high) / 2.0).floor();
                if affordable(scope, &buyable.cost_sets, owned, mid) {
                    low = mid;
                } else {
                    high = mid;
                }
            }
            low
        })
    }

    /// Buys one unit. All cost sets are paid or none are.
    pub fn purchase(&mut self, id: BuyableId) -> bool {
        self.purchase_bulk(id, Decimal::ONE)
    }

    /// Buys `count` units in one atomic step.
    pub fn purchase_bulk(&mut self, id: BuyableId, count: impl Into<Decimal>) -> bool {
        let count = count.into().sanitized().floor();
        if count.is_zero() {
            return false;
        }
        let buyable = &self.buyables[id.0];
        let owned = self.graph.get(buyable.amount);
        if !below_limit(owned, buyable.purchase_limit, count) {
            debug!(buyable = %buyable.key, %count, "purchase limit reached");
            return false;
        }
        let costs = required(&buyable.cost_sets, owned, count);
        let amount = buyable.amount;
        let key = buyable.key.clone();
        if costs.iter().any(|&(resource, cost)| self.value(resource) < cost) {
            return false;
        }

        for (resource, cost) in costs {
            self.resources.spend(&mut self.graph, resource, cost);
        }
        self.graph.set(amount, owned + count);
        debug!(buyable = %key, %count, "purchased");
        true
    }

    pub(crate) fn reset_buyable(&mut self, id: BuyableId) {
        let amount = self.buyables[id.0].amount;
        self.graph.set(amount, Decimal::ZERO);
    }

    pub(crate) fn restore_buyable(&mut self, id: BuyableId, amount: Decimal) {
        let signal = self.buyables[id.0].amount;
        self.graph.set(signal, amount.sanitized().floor());
    }
}
