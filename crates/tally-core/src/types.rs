//! # Domain Types
//!
//! Core domain types shared by the calculators, the document store and the
//! browser front-end (via generated TypeScript).
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Invoice      │   │  InvoiceLine    │   │  ReturnRecord   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  itemNumber     │   │  referenceNumber│       │
//! │  │  invoiceNumber  │   │  quantity       │   │  originalInvoice│       │
//! │  │  lines[]        │   │  unitPrice      │   │  lines[]        │       │
//! │  │  totals         │   │  discount/tax % │   │  (returnedQty)  │       │
//! │  │  version        │   │  previousReturns│   │  totals         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ InvoiceTotals   │   │  InvoiceKind    │                             │
//! │  │  total          │   │  Sale   (+1)    │                             │
//! │  │  discount / tax │   │  Return (-1)    │                             │
//! │  │  net            │   └─────────────────┘                             │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4, immutable, used by the store
//! - `invoice_number` / `reference_number`: human-assigned, unique

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::calc::{self, LineAmounts};
use crate::money::Money;
use crate::QUANTITY_EPSILON;

// =============================================================================
// Invoice Kind
// =============================================================================

/// Whether a document adds to or subtracts from sales figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    /// A sale invoice.
    #[default]
    Sale,
    /// A sales return against an earlier invoice.
    Return,
}

impl InvoiceKind {
    /// Sign multiplier applied when combining documents in reports.
    #[inline]
    pub const fn sign(&self) -> i64 {
        match self {
            InvoiceKind::Sale => 1,
            InvoiceKind::Return => -1,
        }
    }
}

impl fmt::Display for InvoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceKind::Sale => write!(f, "sale"),
            InvoiceKind::Return => write!(f, "return"),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Customer details captured on an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Invoice Line
// =============================================================================

/// One item entry within an invoice.
///
/// The three derived fields are the stored (cent-rounded) results of
/// [`calc::compute_line`]; call [`InvoiceLine::recompute`] after changing
/// any input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub item_number: String,
    pub item_name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    pub unit_price: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub tax_percent: f64,

    /// quantity × unit price, before discount.
    #[serde(default)]
    pub line_total: Money,
    #[serde(default)]
    pub discount_value: Money,
    #[serde(default)]
    pub tax_value: Money,

    /// Quantity already returned against this line. Never exceeds `quantity`.
    #[serde(default)]
    pub previous_returns: f64,

    /// Warehouse the goods left from, when it differs from the invoice's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
}

impl InvoiceLine {
    /// Creates a line and computes its derived amounts.
    pub fn new(
        item_number: impl Into<String>,
        item_name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        unit_price: f64,
        discount_percent: f64,
        tax_percent: f64,
    ) -> Self {
        let mut line = InvoiceLine {
            item_number: item_number.into(),
            item_name: item_name.into(),
            quantity,
            unit: unit.into(),
            unit_price,
            discount_percent,
            tax_percent,
            line_total: Money::zero(),
            discount_value: Money::zero(),
            tax_value: Money::zero(),
            previous_returns: 0.0,
            warehouse_id: None,
        };
        line.recompute();
        line
    }

    /// Full-precision amounts for this line's inputs.
    pub fn amounts(&self) -> LineAmounts {
        calc::compute_line(
            self.unit_price,
            self.quantity,
            self.discount_percent,
            self.tax_percent,
        )
    }

    /// Refreshes the stored derived fields from the input fields.
    pub fn recompute(&mut self) {
        let stored = self.amounts().to_stored();
        self.line_total = stored.subtotal;
        self.discount_value = stored.discount_value;
        self.tax_value = stored.tax_value;
    }

    /// Stored amount after discount (line total − discount).
    #[inline]
    pub fn after_discount(&self) -> Money {
        self.line_total - self.discount_value
    }

    /// Stored net (after discount + tax).
    #[inline]
    pub fn net(&self) -> Money {
        self.after_discount() + self.tax_value
    }

    /// Quantity that may still be returned.
    pub fn returnable_quantity(&self) -> f64 {
        let remaining = self.quantity - self.previous_returns;
        if remaining < QUANTITY_EPSILON {
            0.0
        } else {
            remaining
        }
    }
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Invoice-level sums of the stored line amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub total: Money,
    pub discount: Money,
    pub after_discount: Money,
    pub tax: Money,
    pub net: Money,
}

impl InvoiceTotals {
    /// Applies the kind's sign so sales and returns can be added together.
    pub fn signed(&self, kind: InvoiceKind) -> Self {
        let sign = kind.sign();
        InvoiceTotals {
            total: self.total.signed(sign),
            discount: self.discount.signed(sign),
            after_discount: self.after_discount.signed(sign),
            tax: self.tax.signed(sign),
            net: self.net.signed(sign),
        }
    }
}

impl std::ops::Add for InvoiceTotals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        InvoiceTotals {
            total: self.total + other.total,
            discount: self.discount + other.discount,
            after_discount: self.after_discount + other.after_discount,
            tax: self.tax + other.tax,
            net: self.net + other.net,
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Header and lines of an invoice that has not been stored yet.
///
/// The store assigns `id`, timestamps and version; see
/// [`InvoiceDraft::into_invoice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub invoice_number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub warehouse_id: Option<String>,
    #[serde(default)]
    pub sales_rep: Option<String>,
    #[serde(default)]
    pub customer: Customer,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub lines: Vec<InvoiceLine>,
}

/// A stored sale invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub branch_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub sales_rep: Option<String>,
    pub customer: Customer,
    pub payment_method: Option<String>,
    pub lines: Vec<InvoiceLine>,
    pub totals: InvoiceTotals,
    /// Incremented on every write; used for compare-and-swap updates.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Return Record
// =============================================================================

/// One returned item within a return document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLine {
    /// Position of the returned line on the original invoice.
    pub line_index: usize,
    pub item_number: String,
    pub item_name: String,
    pub unit: String,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub tax_percent: f64,
    /// Quantity on the original sale line.
    pub original_quantity: f64,
    /// Quantity returned before this document.
    pub previous_returns: f64,
    /// Quantity returned by this document.
    pub returned_qty: f64,
    /// Stored amounts for `returned_qty` at the original price, discount and tax.
    pub line_total: Money,
    pub discount_value: Money,
    pub tax_value: Money,
}

impl ReturnLine {
    #[inline]
    pub fn after_discount(&self) -> Money {
        self.line_total - self.discount_value
    }

    #[inline]
    pub fn net(&self) -> Money {
        self.after_discount() + self.tax_value
    }
}

/// A stored sales return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRecord {
    pub id: String,
    pub reference_number: String,
    pub original_invoice_id: String,
    pub original_invoice_number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub warehouse_id: Option<String>,
    /// Copied from the original invoice so reports can group returns.
    pub branch_id: Option<String>,
    pub sales_rep: Option<String>,
    pub payment_method: Option<String>,
    pub lines: Vec<ReturnLine>,
    pub totals: InvoiceTotals,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
