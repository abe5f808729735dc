//! Fixed-point reagent quantities.
//!
//! [`Quantity`] stores hundredths of a unit in an `i64`. Multiplication and
//! division truncate toward zero, so for any reactant quantity `q` and
//! coefficient `c`, `(q / c) * c <= q`: consuming a computed reaction
//! extent can never overdraw the reactant it was computed from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

use crate::error::QuantityError;

const SCALE: i64 = 100;

/// A reagent quantity (or reaction extent) with two decimal places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quantity(i64);

impl Quantity {
    /// Zero units.
    pub const ZERO: Self = Self(0);
    /// One whole unit.
    pub const ONE: Self = Self(SCALE);
    /// Largest representable quantity. Used as the "unbounded" starting
    /// point when an extent is narrowed by successive limits.
    pub const MAX: Self = Self(i64::MAX);

    /// A quantity of `units` whole units (saturating).
    pub const fn new(units: i64) -> Self {
        Self(units.saturating_mul(SCALE))
    }

    /// Construct from raw hundredths.
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw value in hundredths.
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Convert from a float, truncating toward zero.
    ///
    /// NaN maps to zero; infinities and out-of-range values saturate.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        let scaled = (value * SCALE as f64).trunc();
        if scaled >= i64::MAX as f64 {
            Self(i64::MAX)
        } else if scaled <= i64::MIN as f64 {
            Self(i64::MIN)
        } else {
            Self(scaled as i64)
        }
    }

    /// Convert from an `f32`, truncating toward zero.
    pub fn from_f32(value: f32) -> Self {
        Self::from_f64(f64::from(value))
    }

    /// The value as an `f64`.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// The value as an `f32`.
    pub fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }

    /// Whether the quantity is exactly zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Whether the quantity is strictly greater than zero.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Whether the quantity has no fractional part.
    pub fn is_whole(self) -> bool {
        self.0 % SCALE == 0
    }

    /// Drop the fractional part (toward zero).
    pub fn trunc(self) -> Self {
        Self(self.0 - self.0 % SCALE)
    }

    /// Division that returns `None` for a zero divisor.
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.0 == 0 {
            return None;
        }
        Some(Self::saturate(i128::from(self.0) * i128::from(SCALE) / i128::from(rhs.0)))
    }

    /// `self * numerator / denominator`, rounded up, in raw units.
    ///
    /// Used when discarding overflow so the removed total is never short.
    pub fn mul_div_ceil(self, numerator: Self, denominator: Self) -> Self {
        if denominator.0 <= 0 {
            return Self::ZERO;
        }
        let n = i128::from(self.0) * i128::from(numerator.0);
        let d = i128::from(denominator.0);
        let q = n / d;
        let q = if n % d > 0 { q + 1 } else { q };
        Self::saturate(q)
    }

    fn saturate(v: i128) -> Self {
        Self(v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }
}

impl TryFrom<f64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(QuantityError::NotFinite { value });
        }
        let scaled = value * SCALE as f64;
        if scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
            return Err(QuantityError::OutOfRange { value });
        }
        Ok(Self::from_f64(value))
    }
}

impl From<Quantity> for f64 {
    fn from(q: Quantity) -> Self {
        q.to_f64()
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for Quantity {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::saturate(i128::from(self.0) * i128::from(rhs.0) / i128::from(SCALE))
    }
}

/// Truncating division. Dividing by zero yields [`Quantity::MAX`] for a
/// non-negative numerator and [`Quantity::ZERO`] otherwise; use
/// [`Quantity::checked_div`] where that matters.
impl Div for Quantity {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        match self.checked_div(rhs) {
            Some(q) => q,
            None if self.0 >= 0 => Self::MAX,
            None => Self::ZERO,
        }
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE as u64;
        write!(f, "{sign}{}.{:02}", abs / scale, abs % scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn whole_units_round_trip_through_float() {
        assert_eq!(Quantity::new(5).to_f64(), 5.0);
        assert_eq!(Quantity::from_f64(2.5), Quantity::from_raw(250));
    }

    #[test]
    fn from_float_truncates() {
        assert_eq!(Quantity::from_f64(0.019), Quantity::from_raw(1));
        assert_eq!(Quantity::from_f64(-0.019), Quantity::from_raw(-1));
        assert_eq!(Quantity::from_f64(f64::NAN), Quantity::ZERO);
        assert_eq!(Quantity::from_f64(f64::INFINITY), Quantity::MAX);
    }

    #[test]
    fn division_truncates() {
        let third = Quantity::new(1) / Quantity::new(3);
        assert_eq!(third, Quantity::from_raw(33));
        assert_eq!(Quantity::new(10) / Quantity::new(2), Quantity::new(5));
    }

    #[test]
    fn divide_by_zero_saturates() {
        assert_eq!(Quantity::new(1) / Quantity::ZERO, Quantity::MAX);
        assert_eq!(Quantity::new(1).checked_div(Quantity::ZERO), None);
    }

    #[test]
    fn trunc_drops_fraction() {
        assert_eq!(Quantity::from_raw(399).trunc(), Quantity::new(3));
        assert!(Quantity::new(3).is_whole());
        assert!(!Quantity::from_raw(301).is_whole());
    }

    #[test]
    fn display_has_two_decimals() {
        assert_eq!(Quantity::from_raw(1205).to_string(), "12.05");
        assert_eq!(Quantity::from_raw(-50).to_string(), "-0.50");
    }

    #[test]
    fn try_from_rejects_non_finite() {
        assert!(matches!(
            Quantity::try_from(f64::NAN),
            Err(QuantityError::NotFinite { .. })
        ));
        assert_eq!(Quantity::try_from(1.5), Ok(Quantity::from_raw(150)));
    }

    #[test]
    fn mul_div_ceil_never_short() {
        // 1.00 * 0.01 / 3.00 -> 0.0033.. rounds up to 0.01
        let q = Quantity::new(1).mul_div_ceil(Quantity::from_raw(1), Quantity::new(3));
        assert_eq!(q, Quantity::from_raw(1));
    }

    proptest! {
        #[test]
        fn extent_times_coefficient_never_exceeds_available(
            available in 0i64..1_000_000,
            coefficient in 1i64..10_000,
        ) {
            let q = Quantity::from_raw(available);
            let c = Quantity::from_raw(coefficient);
            prop_assert!((q / c) * c <= q);
        }
    }
}
