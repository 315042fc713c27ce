//! # Invoice Aggregator
//!
//! Sums stored line amounts into invoice totals and implements the line
//! editing operations of the invoice page.
//!
//! ## Line Editing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UI action           Core operation              Store write            │
//! │  ─────────           ──────────────              ───────────            │
//! │                                                                         │
//! │  Add line ─────────► invoice.add_line(line) ───► replace whole items[]  │
//! │  Edit line ────────► invoice.update_line(i, l) ► replace whole items[]  │
//! │  Delete line ──────► invoice.remove_line(i) ───► replace whole items[]  │
//! │                                                                         │
//! │  Every operation validates the line, recomputes its derived fields      │
//! │  and refreshes the invoice totals before anything is written.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Invoice, InvoiceDraft, InvoiceLine, InvoiceTotals, ReturnLine};
use crate::validation::{validate_invoice_number, validate_line};
use crate::{MAX_INVOICE_LINES, QUANTITY_EPSILON};

/// Stored amounts of a document line.
///
/// Implemented by sale lines and return lines so both documents share one
/// aggregator.
pub trait LineFigures {
    fn line_total(&self) -> Money;
    fn discount_value(&self) -> Money;
    fn tax_value(&self) -> Money;
}

impl LineFigures for InvoiceLine {
    fn line_total(&self) -> Money {
        self.line_total
    }
    fn discount_value(&self) -> Money {
        self.discount_value
    }
    fn tax_value(&self) -> Money {
        self.tax_value
    }
}

impl LineFigures for ReturnLine {
    fn line_total(&self) -> Money {
        self.line_total
    }
    fn discount_value(&self) -> Money {
        self.discount_value
    }
    fn tax_value(&self) -> Money {
        self.tax_value
    }
}

/// Sums each line's stored fields. Sign-agnostic and side-effect free.
///
/// ## Example
/// ```rust
/// use tally_core::invoice::aggregate;
/// use tally_core::InvoiceLine;
///
/// let lines = vec![
///     InvoiceLine::new("A-1", "Rice 5kg", 2.0, "bag", 100.0, 10.0, 15.0),
///     InvoiceLine::new("B-7", "Tea", 1.0, "box", 50.0, 0.0, 15.0),
/// ];
/// let totals = aggregate(&lines);
///
/// assert_eq!(totals.total.cents(), 25000);
/// assert_eq!(totals.discount.cents(), 2000);
/// assert_eq!(totals.after_discount.cents(), 23000);
/// assert_eq!(totals.tax.cents(), 3450);
/// assert_eq!(totals.net.cents(), 26450);
/// ```
pub fn aggregate<'a, L, I>(lines: I) -> InvoiceTotals
where
    L: LineFigures + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines
        .into_iter()
        .fold(InvoiceTotals::default(), |mut totals, line| {
            let after_discount = line.line_total() - line.discount_value();
            totals.total += line.line_total();
            totals.discount += line.discount_value();
            totals.after_discount += after_discount;
            totals.tax += line.tax_value();
            totals.net += after_discount + line.tax_value();
            totals
        })
}

// =============================================================================
// Draft → Invoice
// =============================================================================

impl InvoiceDraft {
    /// Validates the draft and turns it into a stored-shape invoice.
    ///
    /// Derived line fields are recomputed; values supplied by the caller are
    /// ignored. `previous_returns` is reset to 0 because a new invoice has no
    /// returns against it yet.
    pub fn into_invoice(self, id: String, now: DateTime<Utc>) -> CoreResult<Invoice> {
        validate_invoice_number(&self.invoice_number)?;

        if self.lines.len() > MAX_INVOICE_LINES {
            return Err(CoreError::TooManyLines {
                max: MAX_INVOICE_LINES,
            });
        }

        let mut lines = self.lines;
        for line in lines.iter_mut() {
            trim_keys(line);
            validate_line(line)?;
            line.previous_returns = 0.0;
            line.recompute();
        }

        let totals = aggregate(&lines);

        Ok(Invoice {
            id,
            invoice_number: self.invoice_number.trim().to_string(),
            date: self.date,
            branch_id: self.branch_id,
            warehouse_id: self.warehouse_id,
            sales_rep: self.sales_rep,
            customer: self.customer,
            payment_method: self.payment_method,
            lines,
            totals,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// Line Operations
// =============================================================================

impl Invoice {
    /// Recomputes every line and the invoice totals.
    pub fn recalculate(&mut self) {
        for line in self.lines.iter_mut() {
            line.recompute();
        }
        self.totals = aggregate(&self.lines);
    }

    /// Appends a line.
    pub fn add_line(&mut self, mut line: InvoiceLine) -> CoreResult<()> {
        if self.lines.len() >= MAX_INVOICE_LINES {
            return Err(CoreError::TooManyLines {
                max: MAX_INVOICE_LINES,
            });
        }
        trim_keys(&mut line);
        validate_line(&line)?;

        line.previous_returns = 0.0;
        line.recompute();
        self.lines.push(line);
        self.totals = aggregate(&self.lines);
        Ok(())
    }

    /// Replaces the line at `index`.
    ///
    /// ## Returned Quantities
    /// The existing `previous_returns` is carried over. The new quantity may
    /// not drop below what was already returned, and a line with returns
    /// keeps its item number.
    pub fn update_line(&mut self, index: usize, mut line: InvoiceLine) -> CoreResult<()> {
        trim_keys(&mut line);
        validate_line(&line)?;

        let invoice_number = self.invoice_number.clone();
        let existing = self
            .lines
            .get_mut(index)
            .ok_or(CoreError::LineNotFound {
                invoice_number,
                index,
            })?;

        if existing.previous_returns > QUANTITY_EPSILON && line.item_number != existing.item_number {
            return Err(CoreError::ItemChangeAfterReturns {
                item_number: existing.item_number.clone(),
                replacement: line.item_number,
                returned: existing.previous_returns,
            });
        }

        if line.quantity + QUANTITY_EPSILON < existing.previous_returns {
            return Err(CoreError::QuantityBelowReturned {
                item_number: existing.item_number.clone(),
                quantity: line.quantity,
                returned: existing.previous_returns,
            });
        }

        line.previous_returns = existing.previous_returns;
        line.recompute();
        *existing = line;
        self.totals = aggregate(&self.lines);
        Ok(())
    }

    /// Removes and returns the line at `index`.
    ///
    /// Lines with recorded returns cannot be removed; the return documents
    /// still point at them.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<InvoiceLine> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound {
                invoice_number: self.invoice_number.clone(),
                index,
            });
        }
        if self.lines[index].previous_returns > QUANTITY_EPSILON {
            return Err(CoreError::LineHasReturns {
                item_number: self.lines[index].item_number.clone(),
                returned: self.lines[index].previous_returns,
            });
        }
        let removed = self.lines.remove(index);
        self.totals = aggregate(&self.lines);
        Ok(removed)
    }

    /// Total quantity already returned across all lines.
    pub fn returned_quantity(&self) -> f64 {
        self.lines.iter().map(|l| l.previous_returns).sum()
    }
}

/// Item keys are matched against trimmed return requests.
fn trim_keys(line: &mut InvoiceLine) {
    let trimmed = line.item_number.trim();
    if trimmed.len() != line.item_number.len() {
        line.item_number = trimmed.to_string();
    }
    let trimmed = line.item_name.trim();
    if trimmed.len() != line.item_name.len() {
        line.item_name = trimmed.to_string();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::Customer;
    use chrono::NaiveDate;

    fn draft(lines: Vec<InvoiceLine>) -> InvoiceDraft {
        InvoiceDraft {
            invoice_number: "INV-1001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            branch_id: Some("riyadh".to_string()),
            warehouse_id: None,
            sales_rep: Some("rep-1".to_string()),
            customer: Customer::default(),
            payment_method: None,
            lines,
        }
    }

    fn invoice(lines: Vec<InvoiceLine>) -> Invoice {
        draft(lines)
            .into_invoice("id-1".to_string(), Utc::now())
            .unwrap()
    }

    #[test]
    fn test_aggregate_empty() {
        let empty: Vec<InvoiceLine> = Vec::new();
        assert_eq!(aggregate(&empty), InvoiceTotals::default());
    }

    #[test]
    fn test_into_invoice_recomputes_supplied_amounts() {
        let mut line = InvoiceLine::new("A-1", "Rice", 2.0, "bag", 100.0, 10.0, 15.0);
        line.tax_value = crate::Money::from_cents(1);
        line.previous_returns = 2.0;

        let inv = invoice(vec![line]);
        assert_eq!(inv.lines[0].tax_value.cents(), 2700);
        assert_eq!(inv.lines[0].previous_returns, 0.0);
        assert_eq!(inv.totals.net.cents(), 20700);
        assert_eq!(inv.version, 0);
    }

    #[test]
    fn test_into_invoice_rejects_missing_number() {
        let mut d = draft(vec![]);
        d.invoice_number = "  ".to_string();
        let err = d.into_invoice("id".to_string(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_into_invoice_rejects_oversized_line() {
        let lines = vec![
            InvoiceLine::new("A-1", "Gold", 1.0, "bar", 1e17, 0.0, 0.0),
            InvoiceLine::new("A-2", "Gold", 1.0, "bar", 1e17, 0.0, 0.0),
        ];
        let err = draft(lines).into_invoice("id".to_string(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        let mut inv = invoice(vec![]);
        assert!(inv
            .add_line(InvoiceLine::new("A-1", "Gold", 2.0, "bar", 9e12, 0.0, 0.0))
            .is_err());
        assert!(inv.totals.net.is_zero());
    }

    #[test]
    fn test_add_update_remove_line() {
        let mut inv = invoice(vec![InvoiceLine::new("A-1", "Rice", 2.0, "bag", 100.0, 10.0, 15.0)]);

        inv.add_line(InvoiceLine::new("B-7", "Tea", 1.0, "box", 50.0, 0.0, 15.0))
            .unwrap();
        assert_eq!(inv.lines.len(), 2);
        assert_eq!(inv.totals.net.cents(), 26450);

        inv.update_line(1, InvoiceLine::new("B-7", "Tea", 2.0, "box", 50.0, 0.0, 15.0))
            .unwrap();
        assert_eq!(inv.totals.net.cents(), 20700 + 11500);

        let removed = inv.remove_line(0).unwrap();
        assert_eq!(removed.item_number, "A-1");
        assert_eq!(inv.totals.net.cents(), 11500);
    }

    #[test]
    fn test_update_keeps_previous_returns() {
        let mut inv = invoice(vec![InvoiceLine::new("A-1", "Rice", 10.0, "bag", 1.0, 0.0, 0.0)]);
        inv.lines[0].previous_returns = 4.0;

        inv.update_line(0, InvoiceLine::new("A-1", "Rice", 6.0, "bag", 1.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(inv.lines[0].previous_returns, 4.0);

        let err = inv
            .update_line(0, InvoiceLine::new("A-1", "Rice", 3.0, "bag", 1.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, CoreError::QuantityBelowReturned { .. }));
        assert_eq!(inv.lines[0].quantity, 6.0);
    }

    #[test]
    fn test_remove_line_with_returns_is_refused() {
        let mut inv = invoice(vec![InvoiceLine::new("A-1", "Rice", 10.0, "bag", 1.0, 0.0, 0.0)]);
        inv.lines[0].previous_returns = 1.0;

        let err = inv.remove_line(0).unwrap_err();
        assert!(matches!(err, CoreError::LineHasReturns { .. }));
        assert_eq!(inv.lines.len(), 1);
    }

    #[test]
    fn test_missing_line_index() {
        let mut inv = invoice(vec![]);
        assert!(matches!(
            inv.remove_line(0),
            Err(CoreError::LineNotFound { index: 0, .. })
        ));
        assert!(inv
            .update_line(3, InvoiceLine::new("A-1", "Rice", 1.0, "bag", 1.0, 0.0, 0.0))
            .is_err());
    }

    #[test]
    fn test_add_line_rejects_invalid() {
        let mut inv = invoice(vec![]);
        let err = inv
            .add_line(InvoiceLine::new("", "Rice", 1.0, "bag", 1.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(inv.lines.is_empty());
    }

    #[test]
    fn test_update_cannot_swap_item_after_returns() {
        let mut inv = invoice(vec![InvoiceLine::new("A", "Apples", 10.0, "kg", 1.0, 0.0, 0.0)]);
        inv.lines[0].previous_returns = 4.0;
        let before = inv.clone();

        let err = inv
            .update_line(0, InvoiceLine::new("B", "Bread", 10.0, "pcs", 1.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ItemChangeAfterReturns { ref item_number, ref replacement, returned }
                if item_number == "A" && replacement == "B" && returned == 4.0
        ));
        assert_eq!(inv, before);

        // Padding around the same item number is not a different item
        inv.update_line(0, InvoiceLine::new(" A ", "Apples", 8.0, "kg", 1.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(inv.lines[0].item_number, "A");
        assert_eq!(inv.lines[0].previous_returns, 4.0);
    }

    #[test]
    fn test_update_can_swap_item_without_returns() {
        let mut inv = invoice(vec![InvoiceLine::new("A", "Apples", 10.0, "kg", 1.0, 0.0, 0.0)]);

        inv.update_line(0, InvoiceLine::new("B", "Bread", 2.0, "pcs", 3.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(inv.lines[0].item_number, "B");
        assert_eq!(inv.totals.net.cents(), 600);
    }

    #[test]
    fn test_item_keys_are_trimmed() {
        let mut inv = invoice(vec![InvoiceLine::new(" A-1 ", " Rice ", 2.0, "bag", 1.0, 0.0, 0.0)]);
        assert_eq!(inv.lines[0].item_number, "A-1");
        assert_eq!(inv.lines[0].item_name, "Rice");

        inv.add_line(InvoiceLine::new("B-7\t", "Tea", 1.0, "box", 1.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(inv.lines[1].item_number, "B-7");
    }
}
