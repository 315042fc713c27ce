//! # Return Reconciler
//!
//! Decides whether a requested return quantity is allowed against a sold
//! line, and turns a whole return request into a plan the store can apply.
//!
//! ## Return Submission Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Return Submission                                 │
//! │                                                                         │
//! │  ReturnRequest ──► reconcile_batch(&invoice, &request)                  │
//! │                        │                                                │
//! │                        ├── any line fails ──► Err(ReturnRejection)      │
//! │                        │                       nothing is written       │
//! │                        ▼                                                │
//! │                    ReturnPlan                                           │
//! │                        │                                                │
//! │          ┌─────────────┴──────────────┐                                 │
//! │          ▼                            ▼                                 │
//! │  plan.apply(&mut invoice)     plan.into_record(&invoice, id, now)       │
//! │  previousReturns updated      ReturnRecord priced like the originals    │
//! │          │                            │                                 │
//! │          └──────────► one store transaction ◄──────┘                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariant
//! For every sold line, `previous_returns + returned_qty <= quantity`.
//! A request that would break it is rejected as a whole.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use ts_rs::TS;

use crate::calc;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::invoice::aggregate;
use crate::types::{Invoice, InvoiceLine, ReturnLine, ReturnRecord};
use crate::validation::{validate_reference_number, validate_return_quantity};
use crate::QUANTITY_EPSILON;

// =============================================================================
// Single-Line Reconciliation
// =============================================================================

/// Why a return line was refused.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectReason {
    /// Negative or non-finite quantity.
    #[error("invalid return quantity")]
    InvalidQuantity,

    /// More than what is left to return on the line.
    #[error("exceeds returnable quantity")]
    ExceedsReturnable { returnable: f64, requested: f64 },

    /// The item number is not on the original invoice.
    #[error("item is not on the original invoice")]
    UnknownItem,

    /// The same original line appears twice in one request.
    #[error("item appears more than once in the request")]
    DuplicateItem,

    /// The item is on several lines and no line position was given.
    #[error("item is on several invoice lines, select one")]
    AmbiguousItem,

    /// The given line position holds a different item.
    #[error("line position does not hold this item")]
    ItemMismatch,
}

/// Outcome of checking one requested return quantity.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub accepted: bool,
    /// On rejection this equals the line's current `previous_returns`.
    pub new_previous_returns: f64,
    pub reason: Option<RejectReason>,
}

impl Reconciliation {
    fn rejected(line: &InvoiceLine, reason: RejectReason) -> Self {
        Reconciliation {
            accepted: false,
            new_previous_returns: line.previous_returns,
            reason: Some(reason),
        }
    }
}

/// Checks a requested return quantity against a sold line.
///
/// Accepted results are clamped: `new_previous_returns` never exceeds the
/// line's quantity.
///
/// ## Example
/// ```rust
/// use tally_core::returns::reconcile_return;
/// use tally_core::InvoiceLine;
///
/// let mut line = InvoiceLine::new("A-1", "Rice", 10.0, "bag", 5.0, 0.0, 0.0);
/// line.previous_returns = 8.0;
///
/// assert!(!reconcile_return(&line, 3.0).accepted);
///
/// let ok = reconcile_return(&line, 2.0);
/// assert!(ok.accepted);
/// assert_eq!(ok.new_previous_returns, 10.0);
/// ```
pub fn reconcile_return(line: &InvoiceLine, requested_qty: f64) -> Reconciliation {
    if validate_return_quantity(requested_qty).is_err() {
        return Reconciliation::rejected(line, RejectReason::InvalidQuantity);
    }

    let returnable = line.returnable_quantity();
    if requested_qty > returnable + QUANTITY_EPSILON {
        return Reconciliation::rejected(
            line,
            RejectReason::ExceedsReturnable {
                returnable,
                requested: requested_qty,
            },
        );
    }

    Reconciliation {
        accepted: true,
        new_previous_returns: (line.previous_returns + requested_qty).min(line.quantity),
        reason: None,
    }
}

// =============================================================================
// Return Requests
// =============================================================================

/// One line of a return request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLineRequest {
    pub item_number: String,
    /// Position on the original invoice. Needed only when the item is sold
    /// on more than one line.
    #[serde(default)]
    pub line_index: Option<usize>,
    pub returned_qty: f64,
}

/// A return document as entered on the returns page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub reference_number: String,
    pub original_invoice_number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub warehouse_id: Option<String>,
    pub lines: Vec<ReturnLineRequest>,
}

/// A refused request line.
#[derive(Debug, Clone, PartialEq, Error, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[error("{item_number}: {reason}")]
pub struct LineRejection {
    pub item_number: String,
    pub line_index: Option<usize>,
    pub reason: RejectReason,
}

/// Why a whole return request was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReturnRejection {
    /// No line with a non-zero quantity.
    #[error("Return has no lines to return")]
    EmptyRequest,

    /// The request names a different invoice than the one supplied.
    #[error("Return is for invoice {requested}, not {actual}")]
    InvoiceMismatch { requested: String, actual: String },

    /// The reference number is unusable.
    #[error("Invalid return: {0}")]
    Invalid(#[from] ValidationError),

    /// One or more lines failed; every failing line is listed.
    #[error("Return rejected for {} line(s)", .0.len())]
    Lines(Vec<LineRejection>),
}

// =============================================================================
// Batch Reconciliation
// =============================================================================

/// One accepted line of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedReturn {
    pub line_index: usize,
    pub returned_qty: f64,
    /// `previous_returns` the line had when the plan was made.
    pub previous_returns: f64,
    pub new_previous_returns: f64,
}

/// An accepted return request, ready to be applied and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnPlan {
    pub invoice_id: String,
    /// Invoice version the plan was computed against.
    pub invoice_version: i64,
    pub reference_number: String,
    pub date: NaiveDate,
    pub warehouse_id: Option<String>,
    pub entries: Vec<PlannedReturn>,
}

/// Reconciles every line of a request against the original invoice.
///
/// All-or-nothing: if any line fails, the result lists every failing line
/// and no plan is produced. Lines with a zero quantity are dropped.
pub fn reconcile_batch(
    invoice: &Invoice,
    request: &ReturnRequest,
) -> Result<ReturnPlan, ReturnRejection> {
    validate_reference_number(&request.reference_number)?;

    if request.original_invoice_number.trim() != invoice.invoice_number {
        return Err(ReturnRejection::InvoiceMismatch {
            requested: request.original_invoice_number.clone(),
            actual: invoice.invoice_number.clone(),
        });
    }

    let mut entries = Vec::new();
    let mut rejections = Vec::new();
    let mut seen = HashSet::new();

    for req in &request.lines {
        if req.returned_qty.is_finite() && req.returned_qty.abs() < QUANTITY_EPSILON {
            continue;
        }

        let reject = |reason| LineRejection {
            item_number: req.item_number.clone(),
            line_index: req.line_index,
            reason,
        };

        let index = match resolve_line(invoice, req) {
            Ok(index) => index,
            Err(reason) => {
                rejections.push(reject(reason));
                continue;
            }
        };

        if !seen.insert(index) {
            rejections.push(reject(RejectReason::DuplicateItem));
            continue;
        }

        let line = &invoice.lines[index];
        let outcome = reconcile_return(line, req.returned_qty);
        match outcome.reason {
            Some(reason) => rejections.push(reject(reason)),
            None => entries.push(PlannedReturn {
                line_index: index,
                returned_qty: req.returned_qty,
                previous_returns: line.previous_returns,
                new_previous_returns: outcome.new_previous_returns,
            }),
        }
    }

    if !rejections.is_empty() {
        return Err(ReturnRejection::Lines(rejections));
    }
    if entries.is_empty() {
        return Err(ReturnRejection::EmptyRequest);
    }

    Ok(ReturnPlan {
        invoice_id: invoice.id.clone(),
        invoice_version: invoice.version,
        reference_number: request.reference_number.trim().to_string(),
        date: request.date,
        warehouse_id: request.warehouse_id.clone(),
        entries,
    })
}

/// Finds the original line a request line refers to.
fn resolve_line(invoice: &Invoice, req: &ReturnLineRequest) -> Result<usize, RejectReason> {
    let item_number = req.item_number.trim();

    if let Some(index) = req.line_index {
        return match invoice.lines.get(index) {
            Some(line) if line.item_number == item_number => Ok(index),
            Some(_) => Err(RejectReason::ItemMismatch),
            None => Err(RejectReason::UnknownItem),
        };
    }

    let mut matches = invoice
        .lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.item_number == item_number)
        .map(|(index, _)| index);

    match (matches.next(), matches.next()) {
        (Some(index), None) => Ok(index),
        (Some(_), Some(_)) => Err(RejectReason::AmbiguousItem),
        (None, _) => Err(RejectReason::UnknownItem),
    }
}

// =============================================================================
// Plan Application
// =============================================================================

impl ReturnPlan {
    /// Total quantity returned by this plan.
    pub fn returned_quantity(&self) -> f64 {
        self.entries.iter().map(|e| e.returned_qty).sum()
    }

    /// Writes the new `previous_returns` values onto the original invoice.
    ///
    /// Checks every entry before touching any line.
    pub fn apply(&self, invoice: &mut Invoice) -> CoreResult<()> {
        if invoice.id != self.invoice_id {
            return Err(CoreError::InvoiceMismatch {
                expected: self.invoice_id.clone(),
                actual: invoice.id.clone(),
            });
        }

        if let Some(missing) = self
            .entries
            .iter()
            .find(|e| e.line_index >= invoice.lines.len())
        {
            return Err(CoreError::LineNotFound {
                invoice_number: invoice.invoice_number.clone(),
                index: missing.line_index,
            });
        }

        for entry in &self.entries {
            invoice.lines[entry.line_index].previous_returns = entry.new_previous_returns;
        }
        Ok(())
    }

    /// Builds the return document.
    ///
    /// Each line is priced at the original unit price, discount and tax with
    /// the returned quantity; totals are the sums of those stored amounts.
    pub fn into_record(
        self,
        original: &Invoice,
        id: String,
        created_at: DateTime<Utc>,
    ) -> CoreResult<ReturnRecord> {
        let mut lines = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let sold = original
                .lines
                .get(entry.line_index)
                .ok_or(CoreError::LineNotFound {
                    invoice_number: original.invoice_number.clone(),
                    index: entry.line_index,
                })?;

            let stored = calc::compute_line(
                sold.unit_price,
                entry.returned_qty,
                sold.discount_percent,
                sold.tax_percent,
            )
            .to_stored();

            lines.push(ReturnLine {
                line_index: entry.line_index,
                item_number: sold.item_number.clone(),
                item_name: sold.item_name.clone(),
                unit: sold.unit.clone(),
                unit_price: sold.unit_price,
                discount_percent: sold.discount_percent,
                tax_percent: sold.tax_percent,
                original_quantity: sold.quantity,
                previous_returns: entry.previous_returns,
                returned_qty: entry.returned_qty,
                line_total: stored.subtotal,
                discount_value: stored.discount_value,
                tax_value: stored.tax_value,
            });
        }

        let totals = aggregate(&lines);

        Ok(ReturnRecord {
            id,
            reference_number: self.reference_number,
            original_invoice_id: original.id.clone(),
            original_invoice_number: original.invoice_number.clone(),
            date: self.date,
            warehouse_id: self.warehouse_id.or_else(|| original.warehouse_id.clone()),
            branch_id: original.branch_id.clone(),
            sales_rep: original.sales_rep.clone(),
            payment_method: original.payment_method.clone(),
            lines,
            totals,
            created_at,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Customer, InvoiceDraft};

    fn line(item: &str, qty: f64, prev: f64) -> InvoiceLine {
        let mut l = InvoiceLine::new(item, "Item", qty, "pcs", 10.0, 10.0, 15.0);
        l.previous_returns = prev;
        l
    }

    fn invoice(lines: Vec<InvoiceLine>) -> Invoice {
        let prev: Vec<f64> = lines.iter().map(|l| l.previous_returns).collect();
        let mut inv = InvoiceDraft {
            invoice_number: "INV-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            branch_id: Some("b-1".to_string()),
            warehouse_id: Some("w-main".to_string()),
            sales_rep: Some("rep-1".to_string()),
            customer: Customer::default(),
            payment_method: None,
            lines,
        }
        .into_invoice("inv-id".to_string(), Utc::now())
        .unwrap();
        for (l, p) in inv.lines.iter_mut().zip(prev) {
            l.previous_returns = p;
        }
        inv
    }

    fn request(lines: Vec<(&str, f64)>) -> ReturnRequest {
        ReturnRequest {
            reference_number: "RET-1".to_string(),
            original_invoice_number: "INV-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 9).unwrap(),
            warehouse_id: None,
            lines: lines
                .into_iter()
                .map(|(item, qty)| ReturnLineRequest {
                    item_number: item.to_string(),
                    line_index: None,
                    returned_qty: qty,
                })
                .collect(),
        }
    }

    #[test]
    fn test_over_return_is_rejected() {
        let l = line("A", 10.0, 8.0);
        let r = reconcile_return(&l, 3.0);
        assert!(!r.accepted);
        assert_eq!(r.new_previous_returns, 8.0);
        assert_eq!(r.reason.unwrap().to_string(), "exceeds returnable quantity");
    }

    #[test]
    fn test_exact_remaining_is_accepted() {
        let l = line("A", 10.0, 8.0);
        let r = reconcile_return(&l, 2.0);
        assert!(r.accepted);
        assert_eq!(r.new_previous_returns, 10.0);
        assert!(r.reason.is_none());
    }

    #[test]
    fn test_negative_and_nan_are_rejected() {
        let l = line("A", 10.0, 0.0);
        assert_eq!(reconcile_return(&l, -1.0).reason, Some(RejectReason::InvalidQuantity));
        assert!(!reconcile_return(&l, f64::NAN).accepted);
    }

    #[test]
    fn test_fractional_quantities_tolerate_float_noise() {
        let l = line("A", 0.3, 0.1);
        let r = reconcile_return(&l, 0.2);
        assert!(r.accepted);
        assert!(r.new_previous_returns <= l.quantity);
    }

    #[test]
    fn test_accepted_never_exceeds_quantity() {
        for (qty, prev, req) in [(10.0, 0.0, 10.0), (5.5, 2.25, 3.25), (1.0, 0.7, 0.3)] {
            let r = reconcile_return(&line("A", qty, prev), req);
            assert!(r.accepted);
            assert!(r.new_previous_returns <= qty);
        }
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let inv = invoice(vec![line("A", 10.0, 0.0), line("B", 10.0, 8.0)]);
        let err = reconcile_batch(&inv, &request(vec![("A", 4.0), ("B", 3.0)])).unwrap_err();

        match err {
            ReturnRejection::Lines(rejected) => {
                assert_eq!(rejected.len(), 1);
                assert_eq!(rejected[0].item_number, "B");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(inv.lines[0].previous_returns, 0.0);
        assert_eq!(inv.lines[1].previous_returns, 8.0);
    }

    #[test]
    fn test_batch_lists_every_failure() {
        let inv = invoice(vec![line("A", 10.0, 0.0)]);
        let err = reconcile_batch(&inv, &request(vec![("A", 11.0), ("Z", 1.0), ("A", 1.0)]))
            .unwrap_err();
        let ReturnRejection::Lines(rejected) = err else {
            panic!("expected line rejections");
        };
        let reasons: Vec<_> = rejected.iter().map(|r| r.reason.clone()).collect();
        assert!(matches!(reasons[0], RejectReason::ExceedsReturnable { .. }));
        assert_eq!(reasons[1], RejectReason::UnknownItem);
        assert_eq!(reasons[2], RejectReason::DuplicateItem);
    }

    #[test]
    fn test_empty_and_zero_batches_are_rejected() {
        let inv = invoice(vec![line("A", 10.0, 0.0)]);
        assert_eq!(
            reconcile_batch(&inv, &request(vec![])).unwrap_err(),
            ReturnRejection::EmptyRequest
        );
        assert_eq!(
            reconcile_batch(&inv, &request(vec![("A", 0.0)])).unwrap_err(),
            ReturnRejection::EmptyRequest
        );
    }

    #[test]
    fn test_wrong_invoice_is_rejected() {
        let inv = invoice(vec![line("A", 10.0, 0.0)]);
        let mut req = request(vec![("A", 1.0)]);
        req.original_invoice_number = "INV-2".to_string();
        assert!(matches!(
            reconcile_batch(&inv, &req),
            Err(ReturnRejection::InvoiceMismatch { .. })
        ));
    }

    #[test]
    fn test_ambiguous_item_needs_line_index() {
        let inv = invoice(vec![line("A", 2.0, 0.0), line("A", 3.0, 0.0)]);
        let mut req = request(vec![("A", 1.0)]);
        assert!(matches!(
            reconcile_batch(&inv, &req),
            Err(ReturnRejection::Lines(ref l)) if l[0].reason == RejectReason::AmbiguousItem
        ));

        req.lines[0].line_index = Some(1);
        let plan = reconcile_batch(&inv, &req).unwrap();
        assert_eq!(plan.entries[0].line_index, 1);

        req.lines[0].item_number = "B".to_string();
        assert!(matches!(
            reconcile_batch(&inv, &req),
            Err(ReturnRejection::Lines(ref l)) if l[0].reason == RejectReason::ItemMismatch
        ));
    }

    #[test]
    fn test_apply_and_build_record() {
        let mut inv = invoice(vec![line("A", 10.0, 2.0), line("B", 4.0, 0.0)]);
        let plan = reconcile_batch(&inv, &request(vec![("A", 3.0)])).unwrap();
        assert_eq!(plan.returned_quantity(), 3.0);

        plan.apply(&mut inv).unwrap();
        assert_eq!(inv.lines[0].previous_returns, 5.0);
        assert_eq!(inv.lines[1].previous_returns, 0.0);

        let record = plan.into_record(&inv, "ret-id".to_string(), Utc::now()).unwrap();
        assert_eq!(record.original_invoice_id, "inv-id");
        assert_eq!(record.warehouse_id.as_deref(), Some("w-main"));
        assert_eq!(record.lines.len(), 1);

        let rl = &record.lines[0];
        assert_eq!(rl.previous_returns, 2.0);
        assert_eq!(rl.returned_qty, 3.0);
        // 3 × 10.00 = 30.00, 10% off = 27.00, 15% tax = 4.05
        assert_eq!(rl.line_total.cents(), 3000);
        assert_eq!(rl.discount_value.cents(), 300);
        assert_eq!(rl.tax_value.cents(), 405);
        assert_eq!(record.totals.net.cents(), 3105);
    }

    #[test]
    fn test_apply_to_other_invoice_fails() {
        let inv = invoice(vec![line("A", 10.0, 0.0)]);
        let plan = reconcile_batch(&inv, &request(vec![("A", 1.0)])).unwrap();

        let mut other = inv.clone();
        other.id = "someone-else".to_string();
        assert!(matches!(
            plan.apply(&mut other),
            Err(CoreError::InvoiceMismatch { .. })
        ));
        assert_eq!(other.lines[0].previous_returns, 0.0);
    }
}
