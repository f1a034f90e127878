//! Forward/inverse formula pairs relating an input amount to a gain.
//!
//! A [`Scaling`] is what a layer configures: its parameters may be constants
//! or memos. Resolving it inside a [`Scope`] yields a pure [`Formula`].

use crate::core::ConfigError;
use crate::decimal::Decimal;
use crate::reactive::{Memo, Scope};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Fixed(Decimal),
    Computed(Memo<Decimal>),
}

impl Param {
    pub fn resolve(&self, scope: &Scope<'_>) -> Decimal {
        match *self {
            Self::Fixed(value) => value,
            Self::Computed(memo) => scope.read(memo),
        }
    }

    fn fixed(&self) -> Option<Decimal> {
        match *self {
            Self::Fixed(value) => Some(value),
            Self::Computed(_) => None,
        }
    }
}

impl From<Decimal> for Param {
    fn from(value: Decimal) -> Self {
        Self::Fixed(value)
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Self::Fixed(Decimal::from_f64(value))
    }
}

impl From<Memo<Decimal>> for Param {
    fn from(memo: Memo<Decimal>) -> Self {
        Self::Computed(memo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scaling {
    Exponential {
        coefficient: Param,
        base: Param,
        exponent: Param,
    },
    Polynomial {
        coefficient: Param,
        exponent: Param,
    },
}

impl Scaling {
    /// Gain starts at 1 once the input reaches `coefficient`; every further
    /// unit costs geometrically more (`base^((gain-1)^exponent)`).
    pub fn exponential(
        coefficient: impl Into<Param>,
        base: impl Into<Param>,
        exponent: impl Into<Param>,
    ) -> Self {
        Self::Exponential {
            coefficient: coefficient.into(),
            base: base.into(),
            exponent: exponent.into(),
        }
    }

    /// `gain = (input / coefficient)^exponent` once the input reaches `coefficient`.
    pub fn polynomial(coefficient: impl Into<Param>, exponent: impl Into<Param>) -> Self {
        Self::Polynomial {
            coefficient: coefficient.into(),
            exponent: exponent.into(),
        }
    }

    pub fn resolve(&self, scope: &Scope<'_>) -> Formula {
        match self {
            Self::Exponential {
                coefficient,
                base,
                exponent,
            } => Formula::Exponential {
                coefficient: coefficient.resolve(scope),
                base: base.resolve(scope),
                exponent: exponent.resolve(scope),
            },
            Self::Polynomial {
                coefficient,
                exponent,
            } => Formula::Polynomial {
                coefficient: coefficient.resolve(scope),
                exponent: exponent.resolve(scope),
            },
        }
    }

    /// Checks the constant parameters; computed ones are checked per evaluation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (coefficient, exponent) = match self {
            Self::Exponential {
                coefficient,
                base,
                exponent,
            } => {
                if base.fixed().is_some_and(|base| !(base > Decimal::ONE)) {
                    return Err(ConfigError::InvalidScaling(
                        "exponential base must be greater than 1",
                    ));
                }
                (coefficient, exponent)
            }
            Self::Polynomial {
                coefficient,
                exponent,
            } => (coefficient, exponent),
        };
        if coefficient.fixed().is_some_and(|value| !is_positive(value)) {
            return Err(ConfigError::InvalidScaling("coefficient must be positive"));
        }
        if exponent.fixed().is_some_and(|value| !is_positive(value)) {
            return Err(ConfigError::InvalidScaling("exponent must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formula {
    Exponential {
        coefficient: Decimal,
        base: Decimal,
        exponent: Decimal,
    },
    Polynomial {
        coefficient: Decimal,
        exponent: Decimal,
    },
}

impl Formula {
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Exponential {
                coefficient,
                base,
                exponent,
            } => is_positive(coefficient) && base > Decimal::ONE && base.is_finite() && is_positive(exponent),
            Self::Polynomial {
                coefficient,
                exponent,
            } => is_positive(coefficient) && is_positive(exponent),
        }
    }

    /// Gain reachable with `input`. Zero below the coefficient.
    pub fn to_gain(&self, input: Decimal) -> Decimal {
        let input = input.sanitized();
        if !self.is_valid() {
            return Decimal::ZERO;
        }
        match *self {
            Self::Exponential {
                coefficient,
                base,
                exponent,
            } => {
                if input < coefficient {
                    return Decimal::ZERO;
                }
                let steps = (input / coefficient).log(base).sanitized();
                (steps.pow(Decimal::ONE / exponent) + Decimal::ONE).sanitized()
            }
            Self::Polynomial {
                coefficient,
                exponent,
            } => {
                if input < coefficient {
                    return Decimal::ZERO;
                }
                (input / coefficient).pow(exponent).sanitized()
            }
        }
    }

    /// Input required for the gain to reach `gain`.
    pub fn to_input(&self, gain: Decimal) -> Decimal {
        let gain = gain.sanitized();
        if gain.is_zero() || !self.is_valid() {
            return Decimal::ZERO;
        }
        let input = match *self {
            Self::Exponential {
                coefficient,
                base,
                exponent,
            } => {
                let steps = (gain - Decimal::ONE).max(Decimal::ZERO).pow(exponent);
                coefficient * steps.pow_base(base)
            }
            Self::Polynomial {
                coefficient,
                exponent,
            } => coefficient * gain.pow(Decimal::ONE / exponent),
        };
        if input.is_nan() || input.is_sign_negative() {
            Decimal::ZERO
        } else {
            input
        }
    }

    /// Whole units reachable with `input`.
    ///
    /// The floored gain is checked against [`Formula::to_input`] in both
    /// directions: holding exactly the input advertised for a unit always
    /// reaches it, even when `to_gain` lands a hair below the integer.
    pub fn whole_gain(&self, input: Decimal) -> Decimal {
        let input = input.sanitized();
        let gain = self.to_gain(input).floor();
        if !gain.is_finite() {
            return gain;
        }
        let next = gain + Decimal::ONE;
        if self.to_input(next) <= input {
            next
        } else if gain > Decimal::ZERO && self.to_input(gain) > input {
            gain - Decimal::ONE
        } else {
            gain
        }
    }

    /// Input required to raise an owned gain of `owned` by `count` units.
    pub fn bulk_input(&self, owned: Decimal, count: Decimal) -> Decimal {
        self.to_input(owned.sanitized().floor() + count.sanitized().floor())
    }
}

fn is_positive(value: Decimal) -> bool {
    value.is_finite() && value > Decimal::ZERO
}

pub(crate) fn round_cost(cost: Decimal, round_up: bool) -> Decimal {
    if round_up { cost.ceil() } else { cost }
}

#[cfg(test)]
mod tests {
    use super::{Formula, Scaling};
    use crate::core::ConfigError;
    use crate::decimal::Decimal;

    fn d(value: f64) -> Decimal {
        Decimal::from_f64(value)
    }

    fn combinators() -> Formula {
        Formula::Exponential {
            coefficient: d(1e11),
            base: d(4.0),
            exponent: d(2.0),
        }
    }

    fn sound() -> Formula {
        Formula::Polynomial {
            coefficient: d(1e7),
            exponent: d(1.0 / 3.0),
        }
    }

    fn assert_close(actual: Decimal, expected: Decimal) {
        assert!(
            actual.approx_eq(expected, 1e-9),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn exponential_matches_reference_points() {
        let formula = combinators();
        assert_eq!(formula.to_gain(d(9.9e10)), Decimal::ZERO);
        assert_close(formula.to_gain(d(1e11)), d(1.0));
        assert_close(formula.to_gain(d(1.6e12)), d(2f64.sqrt() + 1.0));
        assert_close(formula.to_input(d(2.0)), d(4e11));
        assert_close(formula.to_input(d(3.0)), d(2.56e13));
    }

    #[test]
    fn polynomial_matches_reference_points() {
        let formula = sound();
        assert_eq!(formula.to_gain(d(5e6)), Decimal::ZERO);
        assert_close(formula.to_gain(d(8e7)), d(2.0));
        assert_close(formula.to_input(d(3.0)), d(2.7e8));
    }

    #[test]
    fn gain_round_trips_through_input() {
        let gains = [0.0, 1.0, 1.5, 2.0, 7.0, 42.0, 1e3, 1e6];
        for formula in [combinators(), sound()] {
            for gain in gains.map(d) {
                let input = formula.to_input(gain);
                assert_close(formula.to_gain(input), gain);
            }
        }
    }

    #[test]
    fn input_round_trips_above_domain_minimum() {
        for formula in [combinators(), sound()] {
            for input in [1e11, 3.3e11, 5e14, 8.1e20].map(d) {
                let gain = formula.to_gain(input);
                assert_close(formula.to_input(gain), input);
            }
        }
    }

    #[test]
    fn both_directions_are_non_decreasing() {
        for formula in [combinators(), sound()] {
            let mut previous_gain = Decimal::ZERO;
            let mut previous_input = Decimal::ZERO;
            for step in 0..200 {
                let input = Decimal::pow10(f64::from(step) * 0.15);
                let gain = formula.to_gain(input);
                assert!(gain >= previous_gain, "to_gain decreased at {input}");
                previous_gain = gain;

                let target = d(f64::from(step) * 0.5);
                let cost = formula.to_input(target);
                assert!(cost >= previous_input, "to_input decreased at {target}");
                previous_input = cost;
            }
        }
    }

    #[test]
    fn invalid_inputs_clamp_to_zero() {
        for formula in [combinators(), sound()] {
            assert_eq!(formula.to_gain(d(-5.0)), Decimal::ZERO);
            assert_eq!(formula.to_gain(Decimal::NAN), Decimal::ZERO);
            assert_eq!(formula.to_gain(Decimal::INFINITY), Decimal::ZERO);
            assert_eq!(formula.to_input(d(-1.0)), Decimal::ZERO);
        }
    }

    #[test]
    fn whole_gain_honours_exact_and_rounded_costs() {
        for formula in [combinators(), sound()] {
            for unit in 1..16 {
                let unit = d(f64::from(unit));
                let cost = formula.to_input(unit);
                assert!(formula.whole_gain(cost) >= unit, "{unit} at {cost}");
                assert!(formula.whole_gain(cost.ceil()) >= unit, "{unit} at ceil {cost}");
                assert!(formula.whole_gain(cost * 0.999) < unit, "{unit} below {cost}");
            }
        }
        assert_eq!(combinators().whole_gain(d(9e10)), Decimal::ZERO);
        assert_eq!(sound().whole_gain(Decimal::NAN), Decimal::ZERO);
    }

    #[test]
    fn bulk_input_is_cost_of_the_combined_target() {
        let formula = sound();
        assert_close(formula.bulk_input(d(2.0), d(3.0)), formula.to_input(d(5.0)));
        assert_close(formula.bulk_input(d(2.0), d(3.0)), d(1.25e9));
    }

    #[test]
    fn validation_rejects_degenerate_constants() {
        assert!(Scaling::exponential(1e11, 4.0, 2.0).validate().is_ok());
        assert!(Scaling::polynomial(1e7, 1.0 / 3.0).validate().is_ok());
        assert!(matches!(
            Scaling::exponential(1e11, 1.0, 2.0).validate(),
            Err(ConfigError::InvalidScaling(_))
        ));
        assert!(matches!(
            Scaling::polynomial(0.0, 0.5).validate(),
            Err(ConfigError::InvalidScaling(_))
        ));
        assert!(matches!(
            Scaling::polynomial(10.0, -1.0).validate(),
            Err(ConfigError::InvalidScaling(_))
        ));
    }
}
