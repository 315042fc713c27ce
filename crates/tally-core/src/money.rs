//! # Money Module
//!
//! Provides the `Money` type used for every stored monetary value.
//!
//! ## Compute in f64, Store in Cents
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE ROUNDING HAPPENS                                                 │
//! │                                                                         │
//! │  unit price × qty ──► discount ──► taxable ──► tax ──► net             │
//! │        (f64, full precision, never rounded in between)                  │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                  Money::from_amount() ← ONLY HERE       │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                           stored line / invoice totals (i64 cents)      │
//! │                                                                         │
//! │  Totals are sums of stored cents, so they always match their lines.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_amount(10.995);
//! assert_eq!(price.cents(), 1100);
//!
//! let total = price + Money::from_cents(500);
//! assert_eq!(total.to_string(), "16.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents, halalas, fils).
///
/// ## Design Decisions
/// - **i64 (signed)**: return documents fold into reports as negatives
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Currency-agnostic**: Display prints `1234.50`, the UI adds the symbol
/// - **Saturating**: sums past the `i64` range stick at its ends instead of
///   wrapping; validation keeps real documents far below that
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Rounds a full-precision amount to cents (half away from zero).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_amount(27.0).cents(), 2700);
    /// assert_eq!(Money::from_amount(1.005).cents(), 101);
    /// assert_eq!(Money::from_amount(-2.345).cents(), -235);
    /// ```
    ///
    /// ## Representation Noise
    /// `1.005` is stored by the FPU as `1.00499999...`. The scaled value is
    /// first snapped to 6 decimals so such inputs round the way they read.
    /// Non-finite input maps to zero; amounts beyond the `i64` cent range
    /// clamp to its ends.
    pub fn from_amount(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money::zero();
        }
        let scaled = amount * 100.0;
        let snapped = (scaled * 1_000_000.0).round() / 1_000_000.0;
        Money(snapped.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal amount (for display and charts only).
    #[inline]
    pub fn amount(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the major unit portion, truncated toward zero.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a report sign multiplier (+1 sale, -1 return).
    #[inline]
    pub const fn signed(&self, sign: i64) -> Self {
        Money(self.0.saturating_mul(sign))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, factor: i64) -> Self {
        Money(self.0.saturating_mul(factor))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_from_amount_rounds_half_away_from_zero() {
        assert_eq!(Money::from_amount(0.125).cents(), 13);
        assert_eq!(Money::from_amount(-0.125).cents(), -13);
        assert_eq!(Money::from_amount(2.675).cents(), 268);
        assert_eq!(Money::from_amount(180.0).cents(), 18000);
    }

    #[test]
    fn test_from_amount_non_finite_is_zero() {
        assert!(Money::from_amount(f64::NAN).is_zero());
        assert!(Money::from_amount(f64::INFINITY).is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
        assert_eq!(a.signed(-1).cents(), -1000);
    }

    #[test]
    fn test_arithmetic_saturates_at_cent_range() {
        let huge = Money::from_amount(1e17);
        assert_eq!(huge.cents(), i64::MAX);

        assert_eq!((huge + huge).cents(), i64::MAX);
        let mut acc = huge;
        acc += Money::from_cents(1);
        assert_eq!(acc.cents(), i64::MAX);
        assert_eq!((-huge - huge).cents(), i64::MIN);
        assert_eq!((huge * 2).cents(), i64::MAX);
        assert_eq!([huge, huge].iter().sum::<Money>().cents(), i64::MAX);
        assert_eq!(Money::from_amount(-1e17).cents(), i64::MIN);
    }

    #[test]
    fn test_sum() {
        let values = vec![Money::from_cents(100), Money::from_cents(250), Money::from_cents(-50)];
        let total: Money = values.iter().sum();
        assert_eq!(total.cents(), 300);

        let empty: Vec<Money> = Vec::new();
        assert!(empty.into_iter().sum::<Money>().is_zero());
    }

    #[test]
    fn test_amount_for_display() {
        assert!((Money::from_cents(20750).amount() - 207.5).abs() < 1e-9);
    }
}
