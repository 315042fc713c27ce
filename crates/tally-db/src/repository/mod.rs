//! # Repository Module
//!
//! Store access for Tally documents.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │                                                                 │
//! │       │  db.returns().submit(&request)                                 │
//! │       ▼                                                                 │
//! │  Repository (THIS MODULE)                                              │
//! │  ├── loads rows, decodes the JSON line arrays                          │
//! │  ├── hands documents to tally-core for every rule and total            │
//! │  └── writes the result back, with a version check                      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InvoiceRepository`] - Sale invoices and line edits
//! - [`ReturnRepository`] - Sales returns against stored invoices
//! - [`ReferenceRepository`] - Branch, warehouse, payment method and rep lists
//! - [`ReportRepository`] - Dashboard aggregation over stored documents

pub mod invoice;
pub mod reference;
pub mod report;
pub mod returns;

pub use invoice::InvoiceRepository;
pub use reference::{ReferenceCache, ReferenceRepository};
pub use report::ReportRepository;
pub use returns::ReturnRepository;
