//! # tally-core: Pure Business Logic for Tally ERP
//!
//! This crate holds the invoice math of Tally ERP as pure functions with
//! zero I/O dependencies. The browser front-end and the `tally-db` document
//! store both call into it; neither re-implements a formula.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally ERP Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Browser front-end (invoice / return / report pages)  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ generated TypeScript types             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │   calc   │ │ invoice  │ │ returns  │ │  report  │          │   │
//! │  │   │  Line    │►│ Totals   │ │ Reconcile│ │ Group &  │          │   │
//! │  │   │  amounts │ │ Lines    │ │ Plan     │ │ Top-N    │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  money   │ │normalize │ │reference │ │validation│          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-db (Document Store Layer)                 │   │
//! │  │          SQLite documents, repositories, return workflow        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`calc`] - Line Calculator (discount, taxable amount, tax, net)
//! - [`invoice`] - Invoice Aggregator and line editing
//! - [`returns`] - Return Reconciler (previous-returns bookkeeping)
//! - [`report`] - Reporting Aggregator (group, sum, rank, month buckets)
//! - [`normalize`] - Adapter from loosely-shaped documents to typed records
//! - [`reference`] - Branch / warehouse / payment method / rep lookups
//! - [`money`] - Money type stored as integer cents
//! - [`types`] - Domain types (Invoice, InvoiceLine, ReturnRecord, ...)
//! - [`validation`] - Field validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output
//! 2. **No I/O**: the document store lives in `tally-db`
//! 3. **Round at storage**: full precision while computing, cents when stored
//! 4. **Explicit Errors**: typed errors, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::calc::compute_line;
//!
//! // 2 × 100.00 with 10% discount and 15% tax
//! let amounts = compute_line(100.0, 2.0, 10.0, 15.0);
//!
//! assert_eq!(amounts.subtotal, 200.0);
//! assert_eq!(amounts.discount_value, 20.0);
//! assert_eq!(amounts.taxable_amount, 180.0);
//! assert_eq!(amounts.tax_value, 27.0);
//! assert_eq!(amounts.net, 207.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calc;
pub mod error;
pub mod invoice;
pub mod money;
pub mod normalize;
pub mod reference;
pub mod report;
pub mod returns;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of items kept in the "top items" chart series.
pub const TOP_ITEMS_LIMIT: usize = 15;

/// Number of sales representatives kept in the "top reps" chart series.
pub const TOP_REPS_LIMIT: usize = 15;

/// Upper bound of a line discount, in percent.
pub const MAX_DISCOUNT_PERCENT: f64 = 100.0;

/// Largest accepted `quantity × unit price` of a single line.
///
/// Keeps the cent totals of a full invoice well inside `i64`.
pub const MAX_LINE_AMOUNT: f64 = 1e13;

/// Maximum number of lines on a single invoice.
///
/// ## Business Reason
/// The whole line set is rewritten on every edit, so very large documents
/// make each keystroke-triggered save expensive.
pub const MAX_INVOICE_LINES: usize = 500;

/// Tolerance used when comparing quantities.
///
/// Quantities may be fractional (kg, metres); sums such as `0.1 + 0.2`
/// must not be rejected against `0.3` on float noise.
pub const QUANTITY_EPSILON: f64 = 1e-9;
