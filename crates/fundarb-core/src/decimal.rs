//! Precision-safe decimal types for rates, prices and quantities.
//!
//! Uses `rust_decimal` for exact decimal arithmetic so that step-size
//! flooring and rate differentials never drift.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

/// Decimal digits kept on rounded funding rates and differentials.
pub const RATE_DECIMALS: u32 = 4;

/// Round a percentage rate to [`RATE_DECIMALS`], half away from zero.
#[inline]
pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Price with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Offset the price by a fractional amount: `price * (1 + fraction)`.
    ///
    /// Negative fractions move the price down. `None` on overflow.
    #[inline]
    pub fn offset(&self, fraction: Decimal) -> Option<Self> {
        (Decimal::ONE + fraction).checked_mul(self.0).map(Self)
    }

    /// Round up to `dp` decimal digits.
    #[inline]
    pub fn round_up(&self, dp: u32) -> Self {
        Self(self.0.round_dp_with_strategy(dp, RoundingStrategy::AwayFromZero))
    }

    /// Round down to `dp` decimal digits.
    #[inline]
    pub fn round_down(&self, dp: u32) -> Self {
        Self(self.0.round_dp_with_strategy(dp, RoundingStrategy::ToZero))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Base-asset quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Truncate down to a multiple of `step`. A zero step is a no-op.
    /// `None` when the step count overflows.
    #[inline]
    pub fn floor_to_step(&self, step: Decimal) -> Option<Self> {
        if step.is_zero() {
            return Some(*self);
        }
        let steps = self.0.checked_div(step)?.floor();
        steps.checked_mul(step).map(Self)
    }

    /// Round up to a multiple of `step`. A zero step is a no-op.
    /// `None` when the step count overflows.
    #[inline]
    pub fn ceil_to_step(&self, step: Decimal) -> Option<Self> {
        if step.is_zero() {
            return Some(*self);
        }
        let steps = self.0.checked_div(step)?.ceil();
        steps.checked_mul(step).map(Self)
    }

    /// Truncate to `dp` decimal digits and drop trailing zeros.
    #[inline]
    pub fn truncate_dp(&self, dp: u32) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::ToZero)
                .normalize(),
        )
    }

    /// Notional value: size * price. `None` on overflow.
    #[inline]
    pub fn notional(&self, price: Price) -> Option<Decimal> {
        self.0.checked_mul(price.0)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_rate_half_away_from_zero() {
        assert_eq!(round_rate(dec!(0.00125)), dec!(0.0013));
        assert_eq!(round_rate(dec!(-0.00125)), dec!(-0.0013));
        assert_eq!(round_rate(dec!(-0.25)), dec!(-0.25));
    }

    #[test]
    fn test_price_offset() {
        let p = Price::new(dec!(100));
        assert_eq!(p.offset(dec!(0.05)).unwrap().inner(), dec!(105.00));
        assert_eq!(p.offset(dec!(-0.05)).unwrap().inner(), dec!(95.00));
    }

    #[test]
    fn test_price_directional_rounding() {
        let p = Price::new(dec!(1.23456));
        assert_eq!(p.round_up(2).inner(), dec!(1.24));
        assert_eq!(p.round_down(2).inner(), dec!(1.23));
    }

    #[test]
    fn test_size_floor_to_step() {
        let s = Size::new(dec!(1.2379));
        assert_eq!(s.floor_to_step(dec!(0.001)).unwrap().inner(), dec!(1.237));
        assert_eq!(s.floor_to_step(dec!(0.5)).unwrap().inner(), dec!(1.0));
        assert_eq!(s.floor_to_step(Decimal::ZERO), Some(s));
    }

    #[test]
    fn test_size_ceil_to_step() {
        let s = Size::new(dec!(0.1001));
        assert_eq!(s.ceil_to_step(dec!(0.001)).unwrap().inner(), dec!(0.101));
    }

    #[test]
    fn test_size_notional() {
        let s = Size::new(dec!(0.5));
        assert_eq!(s.notional(Price::new(dec!(50000))), Some(dec!(25000.0)));
    }

    #[test]
    fn test_overflow_is_none() {
        let huge = Size::new(Decimal::MAX);
        assert_eq!(huge.notional(Price::new(dec!(2))), None);
        assert_eq!(huge.ceil_to_step(dec!(0.0001)), None);
        assert_eq!(huge.floor_to_step(dec!(0.0001)), None);
        assert_eq!(Price::new(Decimal::MAX).offset(dec!(0.05)), None);
    }
}
