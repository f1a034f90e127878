//! Arbitrary-range numbers for resource quantities.
//!
//! A [`Decimal`] stores a normalised `mantissa * 10^exponent` pair with an `f64`
//! mantissa in `[1, 10)` and an `i64` exponent, so quantities far beyond
//! `f64::MAX` keep roughly 15 significant digits.

mod ops;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Exponent gap past which the smaller operand of a sum is lost to rounding.
const MAX_SIGNIFICANT_DIGITS: i64 = 17;

/// From this exponent on the mantissa carries no fractional digits.
const INTEGRAL_EXPONENT: i64 = 15;

#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    mantissa: f64,
    exponent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal `{0}`")]
pub struct ParseDecimalError(String);

impl Decimal {
    pub const ZERO: Self = Self {
        mantissa: 0.0,
        exponent: 0,
    };
    pub const ONE: Self = Self {
        mantissa: 1.0,
        exponent: 0,
    };
    pub const NAN: Self = Self {
        mantissa: f64::NAN,
        exponent: 0,
    };
    pub const INFINITY: Self = Self {
        mantissa: f64::INFINITY,
        exponent: 0,
    };

    pub fn new(mantissa: f64, exponent: i64) -> Self {
        Self::normalized(mantissa, exponent)
    }

    pub fn from_f64(value: f64) -> Self {
        Self::normalized(value, 0)
    }

    /// `10^power` for a real power.
    pub fn pow10(power: f64) -> Self {
        if power.is_nan() {
            return Self::NAN;
        }
        if power == f64::INFINITY {
            return Self::INFINITY;
        }
        if power == f64::NEG_INFINITY {
            return Self::ZERO;
        }
        let whole = power.floor();
        if whole >= i64::MAX as f64 {
            return Self::INFINITY;
        }
        if whole <= i64::MIN as f64 {
            return Self::ZERO;
        }
        Self::normalized(10f64.powf(power - whole), whole as i64)
    }

    fn normalized(mantissa: f64, exponent: i64) -> Self {
        if mantissa == 0.0 {
            return Self::ZERO;
        }
        if !mantissa.is_finite() {
            return Self {
                mantissa,
                exponent: 0,
            };
        }
        let shift = mantissa.abs().log10().floor() as i64;
        let mut mantissa = scale_by_pow10(mantissa, -shift);
        let mut exponent = exponent.saturating_add(shift);
        if mantissa.abs() >= 10.0 {
            mantissa /= 10.0;
            exponent = exponent.saturating_add(1);
        } else if mantissa.abs() < 1.0 {
            mantissa *= 10.0;
            exponent = exponent.saturating_sub(1);
        }
        Self { mantissa, exponent }
    }

    pub fn mantissa(self) -> f64 {
        self.mantissa
    }

    pub fn exponent(self) -> i64 {
        self.exponent
    }

    pub fn to_f64(self) -> f64 {
        if !self.mantissa.is_finite() || self.mantissa == 0.0 {
            return self.mantissa;
        }
        if self.exponent > 308 {
            return self.mantissa.signum() * f64::INFINITY;
        }
        if self.exponent < -324 {
            return 0.0;
        }
        scale_by_pow10(self.mantissa, self.exponent)
    }

    pub fn is_zero(self) -> bool {
        self.mantissa == 0.0
    }

    pub fn is_nan(self) -> bool {
        self.mantissa.is_nan()
    }

    pub fn is_finite(self) -> bool {
        self.mantissa.is_finite()
    }

    pub fn is_sign_negative(self) -> bool {
        self.mantissa < 0.0
    }

    /// Clamps negative, NaN and infinite values to zero.
    pub fn sanitized(self) -> Self {
        if !self.is_finite() || self.is_sign_negative() {
            Self::ZERO
        } else {
            self
        }
    }

    pub fn abs(self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            return Self::NAN;
        }
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            return Self::NAN;
        }
        if self <= other { self } else { other }
    }

    pub fn log10_f64(self) -> f64 {
        if self.mantissa < 0.0 || self.is_nan() {
            return f64::NAN;
        }
        if self.mantissa == 0.0 {
            return f64::NEG_INFINITY;
        }
        self.exponent as f64 + self.mantissa.log10()
    }

    pub fn log10(self) -> Self {
        Self::from_f64(self.log10_f64())
    }

    pub fn ln(self) -> Self {
        Self::from_f64(self.log10_f64() * std::f64::consts::LN_10)
    }

    pub fn log(self, base: Self) -> Self {
        Self::from_f64(self.log10_f64() / base.log10_f64())
    }

    pub fn pow(self, power: Self) -> Self {
        self.pow_f64(power.to_f64())
    }

    pub fn pow_f64(self, power: f64) -> Self {
        if power.is_nan() || self.is_nan() {
            return Self::NAN;
        }
        if power == 0.0 {
            return Self::ONE;
        }
        if self.is_zero() {
            return if power > 0.0 {
                Self::ZERO
            } else {
                Self::INFINITY
            };
        }
        if self.is_sign_negative() {
            if power.fract() != 0.0 {
                return Self::NAN;
            }
            let magnitude = self.abs().pow_f64(power);
            return if (power % 2.0).abs() == 1.0 {
                -magnitude
            } else {
                magnitude
            };
        }
        if !self.is_finite() {
            return if power > 0.0 {
                Self::INFINITY
            } else {
                Self::ZERO
            };
        }

        let scaled_exponent = self.exponent as f64 * power;
        if scaled_exponent.fract() == 0.0 && scaled_exponent.abs() < 9.0e15 {
            let mantissa = self.mantissa.powf(power);
            if mantissa.is_finite() && mantissa != 0.0 {
                return Self::normalized(mantissa, scaled_exponent as i64);
            }
        }
        Self::pow10(self.log10_f64() * power)
    }

    /// `self` raised onto `base`, i.e. `base^self`.
    pub fn pow_base(self, base: Self) -> Self {
        base.pow(self)
    }

    pub fn sqrt(self) -> Self {
        if self.is_sign_negative() || self.is_nan() {
            return Self::NAN;
        }
        if self.is_zero() || !self.is_finite() {
            return self;
        }
        let rest = self.exponent.rem_euclid(2);
        Self::normalized(
            scale_by_pow10(self.mantissa, rest).sqrt(),
            (self.exponent - rest) / 2,
        )
    }

    pub fn cbrt(self) -> Self {
        if self.is_zero() || !self.is_finite() {
            return self;
        }
        let rest = self.exponent.rem_euclid(3);
        Self::normalized(
            scale_by_pow10(self.mantissa, rest).cbrt(),
            (self.exponent - rest) / 3,
        )
    }

    pub fn floor(self) -> Self {
        if !self.is_finite() || self.exponent >= INTEGRAL_EXPONENT {
            return self;
        }
        if self.exponent < 0 {
            return if self.mantissa >= 0.0 {
                Self::ZERO
            } else {
                -Self::ONE
            };
        }
        // The trip through f64 may round up past `self`.
        let floored = Self::from_f64(self.to_f64().floor());
        if floored > self {
            floored - Self::ONE
        } else {
            floored
        }
    }

    pub fn ceil(self) -> Self {
        if !self.is_finite() || self.exponent >= INTEGRAL_EXPONENT {
            return self;
        }
        if self.exponent < 0 {
            return if self.mantissa > 0.0 {
                Self::ONE
            } else {
                Self::ZERO
            };
        }
        let ceiled = Self::from_f64(self.to_f64().ceil());
        if ceiled < self {
            ceiled + Self::ONE
        } else {
            ceiled
        }
    }

    pub fn round(self) -> Self {
        if !self.is_finite() || self.exponent >= INTEGRAL_EXPONENT {
            return self;
        }
        if self.exponent < -1 {
            return Self::ZERO;
        }
        Self::from_f64(self.to_f64().round())
    }

    /// Relative comparison used by tests and by bulk-cost corrections.
    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        if self == other {
            return true;
        }
        let scale = self.abs().max(other.abs());
        if scale.is_zero() {
            return true;
        }
        ((self - other).abs() / scale).to_f64() <= tolerance
    }
}

fn scale_by_pow10(value: f64, mut power: i64) -> f64 {
    let mut value = value;
    while power > 300 {
        value *= 1e300;
        power -= 300;
    }
    while power < -300 {
        value /= 1e300;
        power += 300;
    }
    if power >= 0 {
        value * 10f64.powi(power as i32)
    } else {
        value / 10f64.powi((-power) as i32)
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            return None;
        }
        if !self.is_finite() || !other.is_finite() || self.is_zero() || other.is_zero() {
            return self.mantissa.partial_cmp(&other.mantissa);
        }
        if self.is_sign_negative() != other.is_sign_negative() {
            return self.mantissa.partial_cmp(&other.mantissa);
        }
        let by_exponent = self.exponent.cmp(&other.exponent);
        let by_exponent = if self.is_sign_negative() {
            by_exponent.reverse()
        } else {
            by_exponent
        };
        match by_exponent {
            Ordering::Equal => self.mantissa.partial_cmp(&other.mantissa),
            ordering => Some(ordering),
        }
    }
}

/// Plain notation is used only when it parses back to the same mantissa;
/// everything else is written as `<mantissa>e<exponent>`.
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_finite() {
            return write!(f, "{}", self.mantissa);
        }
        if (-6..21).contains(&self.exponent) {
            let plain = self.to_f64();
            let reparsed = Self::from_f64(plain);
            if reparsed.exponent == self.exponent
                && reparsed.mantissa.to_bits() == self.mantissa.to_bits()
            {
                return write!(f, "{plain}");
            }
        }
        write!(f, "{}e{}", self.mantissa, self.exponent)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ParseDecimalError(trimmed.to_string());
        match trimmed.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => {
                let mantissa = mantissa.parse::<f64>().map_err(|_| invalid())?;
                let exponent = exponent.parse::<i64>().map_err(|_| invalid())?;
                Ok(Self::new(mantissa, exponent))
            }
            None => trimmed.parse::<f64>().map(Self::from_f64).map_err(|_| invalid()),
        }
    }
}

impl From<f64> for Decimal {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<u32> for Decimal {
    fn from(value: u32) -> Self {
        Self::from_f64(f64::from(value))
    }
}

impl From<i32> for Decimal {
    fn from(value: i32) -> Self {
        Self::from_f64(f64::from(value))
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Self::from_f64(value as f64)
    }
}

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(Self::from_f64(value)),
            Repr::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}
