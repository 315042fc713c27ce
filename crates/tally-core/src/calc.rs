//! # Line Calculator
//!
//! Turns a line's unit price, quantity, discount % and tax % into its
//! discount value, taxable amount, tax value and net.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal        = unit_price × quantity                                │
//! │  discount_value  = subtotal × discount% / 100                           │
//! │  taxable_amount  = subtotal − discount_value                            │
//! │  tax_value       = taxable_amount × tax% / 100                          │
//! │  net             = taxable_amount + tax_value                           │
//! │                                                                         │
//! │  Inputs are clamped first:                                              │
//! │    quantity, unit_price, tax%  → floored at 0                           │
//! │    discount%                   → clamped to [0, 100]                    │
//! │    NaN                         → 0                                      │
//! │                                                                         │
//! │  Nothing is rounded here. Rounding to cents happens once, in            │
//! │  LineAmounts::to_stored().                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::MAX_DISCOUNT_PERCENT;

/// Full-precision amounts for one line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineAmounts {
    pub subtotal: f64,
    pub discount_value: f64,
    pub taxable_amount: f64,
    pub tax_value: f64,
    pub net: f64,
}

/// Cent-rounded amounts, as written to the store.
///
/// `taxable_amount` and `net` are derived from the rounded parts so a stored
/// line always balances: `taxable = subtotal − discount`, `net = taxable + tax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StoredAmounts {
    pub subtotal: Money,
    pub discount_value: Money,
    pub taxable_amount: Money,
    pub tax_value: Money,
    pub net: Money,
}

impl LineAmounts {
    /// Rounds to cents for storage.
    pub fn to_stored(&self) -> StoredAmounts {
        let subtotal = Money::from_amount(self.subtotal);
        let discount_value = Money::from_amount(self.discount_value);
        let tax_value = Money::from_amount(self.tax_value);
        let taxable_amount = subtotal - discount_value;

        StoredAmounts {
            subtotal,
            discount_value,
            taxable_amount,
            tax_value,
            net: taxable_amount + tax_value,
        }
    }
}

/// Computes a line's amounts.
///
/// Total over its numeric domain: out-of-range inputs are clamped, never
/// rejected. Validation of user input happens in [`crate::validation`].
///
/// ## Example
/// ```rust
/// use tally_core::calc::compute_line;
///
/// let amounts = compute_line(100.0, 2.0, 10.0, 15.0);
/// assert_eq!(amounts.net, 207.0);
///
/// // Discount above 100% is clamped
/// let free = compute_line(50.0, 1.0, 150.0, 15.0);
/// assert_eq!(free.net, 0.0);
/// ```
pub fn compute_line(
    unit_price: f64,
    quantity: f64,
    discount_percent: f64,
    tax_percent: f64,
) -> LineAmounts {
    let unit_price = floor_at_zero(unit_price);
    let quantity = floor_at_zero(quantity);
    let discount_percent = floor_at_zero(discount_percent).min(MAX_DISCOUNT_PERCENT);
    let tax_percent = floor_at_zero(tax_percent);

    let subtotal = unit_price * quantity;
    let discount_value = subtotal * discount_percent / 100.0;
    let taxable_amount = subtotal - discount_value;
    let tax_value = taxable_amount * tax_percent / 100.0;

    LineAmounts {
        subtotal,
        discount_value,
        taxable_amount,
        tax_value,
        net: taxable_amount + tax_value,
    }
}

/// NaN and negatives become 0. Infinity is left for the caller's validation.
#[inline]
fn floor_at_zero(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        value
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_reference_example() {
        let a = compute_line(100.0, 2.0, 10.0, 15.0);
        assert_eq!(a.subtotal, 200.0);
        assert_eq!(a.discount_value, 20.0);
        assert_eq!(a.taxable_amount, 180.0);
        assert_eq!(a.tax_value, 27.0);
        assert_eq!(a.net, 207.0);
    }

    #[test]
    fn test_net_matches_closed_form() {
        let cases = [
            (12.5, 3.0, 0.0, 0.0),
            (19.99, 7.0, 12.5, 15.0),
            (0.333, 1.5, 33.0, 5.0),
            (1250.0, 0.25, 100.0, 20.0),
            (8.75, 40.0, 2.5, 0.0),
        ];
        for (price, qty, d, t) in cases {
            let a = compute_line(price, qty, d, t);
            let expected = price * qty * (1.0 - d / 100.0) * (1.0 + t / 100.0);
            assert!(close(a.net, expected), "{price} {qty} {d} {t}: {} vs {expected}", a.net);
        }
    }

    #[test]
    fn test_is_pure() {
        let first = compute_line(19.99, 7.0, 12.5, 15.0);
        let second = compute_line(19.99, 7.0, 12.5, 15.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_inputs_are_clamped() {
        let negative = compute_line(-10.0, 2.0, 0.0, 0.0);
        assert_eq!(negative.net, 0.0);

        let negative_qty = compute_line(10.0, -2.0, 0.0, 0.0);
        assert_eq!(negative_qty.subtotal, 0.0);

        let over_discount = compute_line(10.0, 2.0, 250.0, 10.0);
        assert_eq!(over_discount.discount_value, 20.0);
        assert_eq!(over_discount.net, 0.0);

        let negative_tax = compute_line(10.0, 2.0, 0.0, -5.0);
        assert_eq!(negative_tax.tax_value, 0.0);

        let nan = compute_line(f64::NAN, 2.0, f64::NAN, 15.0);
        assert_eq!(nan.net, 0.0);
    }

    #[test]
    fn test_tax_uses_unrounded_discount() {
        // discount = 0.333 × 10% = 0.0333; taxable 0.2997; tax at 50% = 0.14985
        // Rounding the discount first would give taxable 0.30 and tax 0.15.
        let a = compute_line(0.333, 1.0, 10.0, 50.0);
        assert!(close(a.tax_value, 0.14985));

        let stored = a.to_stored();
        assert_eq!(stored.tax_value.cents(), 15);
        assert_eq!(stored.discount_value.cents(), 3);
    }

    #[test]
    fn test_stored_amounts_balance() {
        let stored = compute_line(19.99, 7.0, 12.5, 15.0).to_stored();
        assert_eq!(stored.subtotal.cents(), 13993);
        assert_eq!(stored.taxable_amount, stored.subtotal - stored.discount_value);
        assert_eq!(stored.net, stored.taxable_amount + stored.tax_value);
    }
}
