//! # tally-db: Document Store for Tally ERP
//!
//! Stores invoices, returns and reference lists in SQLite through sqlx.
//! All invoice math and return rules live in `tally-core`; this crate loads
//! documents, calls into the core, and writes the results back.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  Caller (HTTP handler, CLI, seed binary)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo   │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ ReturnRepo    │    │ _schema.sql  │  │   │
//! │  │   │ TallyConfig   │    │ ReferenceRepo │    │              │  │   │
//! │  │   │               │    │ ReportRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  └────────────────────────────────┼───────────────────────────────┘   │
//! │       │                           ▼                                    │
//! │       │                    tally-core (pure rules)                     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML config file with environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Invoice, return, reference and report access
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, TallyConfig};
//!
//! let config = TallyConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let record = db.returns().submit(&request).await?;
//! let refs = db.reference_cache().await?;
//! let report = db.reports().sales_report(&refs, &config.report_options()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, TallyConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    InvoiceRepository, ReferenceCache, ReferenceRepository, ReportRepository, ReturnRepository,
};

// =============================================================================
// Logging
// =============================================================================

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; without it, Tally logs at debug and sqlx at
/// warn. Calling this twice is an error from `tracing_subscriber`, so only
/// binaries call it.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally_db=debug,tally_core=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
