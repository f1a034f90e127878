use crate::core::{ConfigError, Resource};
use crate::decimal::Decimal;
use crate::model::LayerBuilder;
use crate::reactive::{Memo, Scope, Signal};

use super::ExpressionDefinition;
use super::build::{qualify, resolve};

/// An [`ExpressionDefinition`] with every reference resolved to a handle.
#[derive(Debug, Clone)]
pub(crate) enum Expression {
    Constant(Decimal),
    Resource(Resource),
    Amount(Signal<Decimal>),
    Effect(Memo<Decimal>),
    Sum(Vec<Expression>),
    Product(Vec<Expression>),
    Pow(Box<Expression>, Decimal),
    Log10(Box<Expression>),
    Sqrt(Box<Expression>),
    Cbrt(Box<Expression>),
    IfPurchased {
        purchased: Signal<bool>,
        then: Box<Expression>,
        otherwise: Decimal,
    },
}

impl Expression {
    pub(crate) fn compile(
        layer: &LayerBuilder<'_>,
        definition: &ExpressionDefinition,
    ) -> Result<Self, ConfigError> {
        let nested = |of: &ExpressionDefinition| Self::compile(layer, of).map(Box::new);
        let all = |items: &[ExpressionDefinition]| {
            items
                .iter()
                .map(|item| Self::compile(layer, item))
                .collect::<Result<Vec<_>, _>>()
        };
        let sim = layer.simulation();

        Ok(match definition {
            ExpressionDefinition::Constant { value } => Self::Constant(*value),
            ExpressionDefinition::Resource { resource } => Self::Resource(resolve(layer, resource)?),
            ExpressionDefinition::Proportional { resource, factor } => Self::Product(vec![
                Self::Resource(resolve(layer, resource)?),
                Self::Constant(*factor),
            ]),
            ExpressionDefinition::Amount { buyable } => {
                let key = qualify(layer, buyable);
                let id = sim.buyable_by_key(&key).ok_or(ConfigError::UnknownKey(key))?;
                Self::Amount(sim.buyable(id).amount_signal())
            }
            ExpressionDefinition::Effect { effect } => {
                let key = qualify(layer, effect);
                let id = sim.effect_by_key(&key).ok_or(ConfigError::UnknownKey(key))?;
                Self::Effect(sim.effect(id).value_memo())
            }
            ExpressionDefinition::Sum { terms } => Self::Sum(all(terms)?),
            ExpressionDefinition::Product { factors } => Self::Product(all(factors)?),
            ExpressionDefinition::Pow { of, exponent } => Self::Pow(nested(of)?, *exponent),
            ExpressionDefinition::Log10 { of } => Self::Log10(nested(of)?),
            ExpressionDefinition::Sqrt { of } => Self::Sqrt(nested(of)?),
            ExpressionDefinition::Cbrt { of } => Self::Cbrt(nested(of)?),
            ExpressionDefinition::IfPurchased {
                upgrade,
                then,
                otherwise,
            } => {
                let key = qualify(layer, upgrade);
                let id = sim.upgrade_by_key(&key).ok_or(ConfigError::UnknownKey(key))?;
                Self::IfPurchased {
                    purchased: sim.upgrade(id).purchased_signal(),
                    then: nested(then)?,
                    otherwise: *otherwise,
                }
            }
        })
    }

    pub(crate) fn eval(&self, scope: &Scope<'_>) -> Decimal {
        match self {
            Self::Constant(value) => *value,
            Self::Resource(resource) => scope.resource(*resource),
            Self::Amount(amount) => scope.get(*amount),
            Self::Effect(effect) => scope.read(*effect),
            Self::Sum(terms) => terms.iter().map(|term| term.eval(scope)).sum(),
            Self::Product(factors) => factors
                .iter()
                .fold(Decimal::ONE, |product, factor| product * factor.eval(scope)),
            Self::Pow(of, exponent) => of.eval(scope).pow(*exponent),
            Self::Log10(of) => of.eval(scope).log10(),
            Self::Sqrt(of) => of.eval(scope).sqrt(),
            Self::Cbrt(of) => of.eval(scope).cbrt(),
            Self::IfPurchased {
                purchased,
                then,
                otherwise,
            } => {
                if scope.get(*purchased) {
                    then.eval(scope)
                } else {
                    *otherwise
                }
            }
        }
    }

    /// Registers the expression as a memo. Values that are not finite or
    /// fall below zero read as zero.
    pub(crate) fn into_memo(self, layer: &mut LayerBuilder<'_>) -> Memo<Decimal> {
        layer.memo(move |scope| self.eval(scope).sanitized())
    }
}
