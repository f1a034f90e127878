use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use super::{Decimal, MAX_SIGNIFICANT_DIGITS, scale_by_pow10};

impl Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        if self.is_nan() || rhs.is_nan() {
            return Decimal::NAN;
        }
        if !self.is_finite() || !rhs.is_finite() {
            return Decimal::from_f64(self.to_f64() + rhs.to_f64());
        }
        if self.is_zero() {
            return rhs;
        }
        if rhs.is_zero() {
            return self;
        }

        let (larger, smaller) = if self.exponent >= rhs.exponent {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let Some(gap) = larger.exponent.checked_sub(smaller.exponent) else {
            return larger;
        };
        if gap > MAX_SIGNIFICANT_DIGITS {
            return larger;
        }
        Decimal::normalized(
            larger.mantissa + scale_by_pow10(smaller.mantissa, -gap),
            larger.exponent,
        )
    }
}

impl Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        self + (-rhs)
    }
}

impl Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        if !self.is_finite() || !rhs.is_finite() {
            return Decimal::from_f64(self.to_f64() * rhs.to_f64());
        }
        Decimal::normalized(
            self.mantissa * rhs.mantissa,
            self.exponent.saturating_add(rhs.exponent),
        )
    }
}

impl Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        if !self.is_finite() || !rhs.is_finite() || rhs.is_zero() {
            return Decimal::from_f64(self.to_f64() / rhs.to_f64());
        }
        Decimal::normalized(
            self.mantissa / rhs.mantissa,
            self.exponent.saturating_sub(rhs.exponent),
        )
    }
}

impl Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        if self.is_zero() {
            return self;
        }
        Decimal {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

macro_rules! scalar_ops {
    ($($trait:ident :: $method:ident, $assign_trait:ident :: $assign_method:ident;)*) => {
        $(
            impl $trait<f64> for Decimal {
                type Output = Decimal;

                fn $method(self, rhs: f64) -> Decimal {
                    $trait::$method(self, Decimal::from_f64(rhs))
                }
            }

            impl $assign_trait for Decimal {
                fn $assign_method(&mut self, rhs: Decimal) {
                    *self = $trait::$method(*self, rhs);
                }
            }

            impl $assign_trait<f64> for Decimal {
                fn $assign_method(&mut self, rhs: f64) {
                    *self = $trait::$method(*self, Decimal::from_f64(rhs));
                }
            }
        )*
    };
}

scalar_ops! {
    Add::add, AddAssign::add_assign;
    Sub::sub, SubAssign::sub_assign;
    Mul::mul, MulAssign::mul_assign;
    Div::div, DivAssign::div_assign;
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::ZERO, |acc, value| acc + value)
    }
}

#[cfg(test)]
mod tests {
    use super::Decimal;

    #[test]
    fn scalar_operands_promote_to_decimal() {
        let mut value = Decimal::from_f64(10.0);
        value += 5.0;
        value *= 2.0;
        value -= Decimal::from_f64(10.0);
        value /= 4.0;
        assert_eq!(value, Decimal::from_f64(5.0));
        assert_eq!(value * 2.0 + 1.0, Decimal::from_f64(11.0));
    }

    #[test]
    fn division_by_zero_is_not_finite() {
        assert!(!(Decimal::ONE / Decimal::ZERO).is_finite());
        assert!((Decimal::ZERO / Decimal::ZERO).is_nan());
    }

    #[test]
    fn sums_an_iterator() {
        let total: Decimal = [1.0, 2.0, 3.5].into_iter().map(Decimal::from_f64).sum();
        assert_eq!(total, Decimal::from_f64(6.5));
    }
}
