//! # Invoice Repository
//!
//! Stores sale invoices as documents: header columns plus the whole line set
//! as one JSON array.
//!
//! ## Line Edit Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Line Edit Lifecycle                               │
//! │                                                                         │
//! │  1. LOAD                                                               │
//! │     └── get_by_id() → Invoice { version: n }                           │
//! │                                                                         │
//! │  2. EDIT (tally-core, in memory)                                       │
//! │     └── add_line / update_line / remove_line → totals recomputed       │
//! │                                                                         │
//! │  3. SAVE (compare-and-swap)                                            │
//! │     └── UPDATE ... SET items = ?, totals = ?, version = n + 1          │
//! │               WHERE id = ? AND version = n                             │
//! │         ├── 1 row  → saved                                             │
//! │         └── 0 rows → DbError::Conflict (or NotFound), nothing written  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::normalize::normalize_stored_invoice;
use tally_core::report::DateRange;
use tally_core::{Customer, Invoice, InvoiceDraft, InvoiceLine, InvoiceTotals, Money};

/// Columns selected for an [`InvoiceRow`].
pub(crate) const INVOICE_COLUMNS: &str = "id, invoice_number, invoice_date, branch_id, \
     warehouse_id, sales_rep, customer_name, customer_phone, payment_method, items, \
     total_cents, discount_cents, after_discount_cents, tax_cents, net_cents, version, \
     created_at, updated_at";

// =============================================================================
// Record Type
// =============================================================================

/// One row of the `invoices` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct InvoiceRow {
    pub id: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub branch_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub sales_rep: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: Option<String>,
    pub items: String,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub after_discount_cents: i64,
    pub tax_cents: i64,
    pub net_cents: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    pub fn into_invoice(self) -> DbResult<Invoice> {
        let lines: Vec<InvoiceLine> = serde_json::from_str(&self.items)?;

        Ok(Invoice {
            id: self.id,
            invoice_number: self.invoice_number,
            date: self.invoice_date,
            branch_id: self.branch_id,
            warehouse_id: self.warehouse_id,
            sales_rep: self.sales_rep,
            customer: Customer {
                name: self.customer_name,
                phone: self.customer_phone,
            },
            payment_method: self.payment_method,
            lines,
            totals: InvoiceTotals {
                total: Money::from_cents(self.total_cents),
                discount: Money::from_cents(self.discount_cents),
                after_discount: Money::from_cents(self.after_discount_cents),
                tax: Money::from_cents(self.tax_cents),
                net: Money::from_cents(self.net_cents),
            },
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Shared Queries
// =============================================================================
// Generic over the executor so the return workflow can run them inside its
// transaction.

/// Loads an invoice by its human-assigned number.
pub(crate) async fn fetch_by_number<'e, E>(executor: E, number: &str) -> DbResult<Option<Invoice>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_number = ?1");
    let row: Option<InvoiceRow> = sqlx::query_as(&sql)
        .bind(number.trim())
        .fetch_optional(executor)
        .await?;

    row.map(InvoiceRow::into_invoice).transpose()
}

/// Rewrites the line set and totals if the stored version still equals
/// `invoice.version`. Returns whether a row was updated.
pub(crate) async fn write_lines<'e, E>(
    executor: E,
    invoice: &Invoice,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let items = serde_json::to_string(&invoice.lines)?;
    let totals = &invoice.totals;

    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            items = ?1,
            total_cents = ?2,
            discount_cents = ?3,
            after_discount_cents = ?4,
            tax_cents = ?5,
            net_cents = ?6,
            version = version + 1,
            updated_at = ?7
        WHERE id = ?8 AND version = ?9
        "#,
    )
    .bind(items)
    .bind(totals.total.cents())
    .bind(totals.discount.cents())
    .bind(totals.after_discount.cents())
    .bind(totals.tax.cents())
    .bind(totals.net.cents())
    .bind(now)
    .bind(&invoice.id)
    .bind(invoice.version)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale invoice documents.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Validates a draft, assigns an id and stores it.
    ///
    /// ## Errors
    /// - `DbError::Domain` when a line or the invoice number is invalid
    /// - `DbError::UniqueViolation` when the invoice number is taken
    pub async fn create(&self, draft: InvoiceDraft) -> DbResult<Invoice> {
        let invoice = draft.into_invoice(Uuid::new_v4().to_string(), Utc::now())?;
        self.insert(&invoice).await?;

        info!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            lines = invoice.lines.len(),
            net = %invoice.totals.net,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Normalizes a loosely-shaped document and stores it.
    ///
    /// Quantities already returned on the document's lines are kept.
    pub async fn import_document(&self, doc: &Value) -> DbResult<Invoice> {
        let invoice = normalize_stored_invoice(doc, Uuid::new_v4().to_string(), Utc::now())?;
        debug!(
            invoice_number = %invoice.invoice_number,
            lines = invoice.lines.len(),
            "Normalized imported document"
        );

        self.insert(&invoice).await?;
        Ok(invoice)
    }

    /// Inserts a complete invoice.
    pub async fn insert(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, invoice_number = %invoice.invoice_number, "Inserting invoice");

        let items = serde_json::to_string(&invoice.lines)?;
        let totals = &invoice.totals;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, invoice_date,
                branch_id, warehouse_id, sales_rep,
                customer_name, customer_phone, payment_method,
                items,
                total_cents, discount_cents, after_discount_cents, tax_cents, net_cents,
                version, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10,
                ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.date)
        .bind(&invoice.branch_id)
        .bind(&invoice.warehouse_id)
        .bind(&invoice.sales_rep)
        .bind(&invoice.customer.name)
        .bind(&invoice.customer.phone)
        .bind(&invoice.payment_method)
        .bind(items)
        .bind(totals.total.cents())
        .bind(totals.discount.cents())
        .bind(totals.after_discount.cents())
        .bind(totals.tax.cents())
        .bind(totals.net.cents())
        .bind(invoice.version)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("invoice_number", &invoice.invoice_number)
            }
            other => other,
        })?;

        Ok(())
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1");
        let row: Option<InvoiceRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(InvoiceRow::into_invoice).transpose()
    }

    /// Gets an invoice by its human-assigned number.
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Invoice>> {
        fetch_by_number(&self.pool, number).await
    }

    /// Lists invoices dated inside `range`, oldest first.
    pub async fn list(&self, range: &DateRange) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE (?1 IS NULL OR invoice_date >= ?1) AND (?2 IS NULL OR invoice_date <= ?2) \
             ORDER BY invoice_date, invoice_number"
        );
        let rows: Vec<InvoiceRow> = sqlx::query_as(&sql)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }

    /// Counts stored invoices.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Persists the whole line set and totals of an edited invoice.
    ///
    /// `invoice.version` must still match the stored version. Returns the
    /// invoice as stored, with its version incremented.
    pub async fn save_lines(&self, invoice: &Invoice) -> DbResult<Invoice> {
        let now = Utc::now();

        if !write_lines(&self.pool, invoice, now).await? {
            return Err(self.missing_or_conflict(invoice).await);
        }

        debug!(
            id = %invoice.id,
            version = invoice.version + 1,
            lines = invoice.lines.len(),
            "Invoice lines saved"
        );

        let mut saved = invoice.clone();
        saved.version += 1;
        saved.updated_at = now;
        Ok(saved)
    }

    /// Appends a line and saves.
    pub async fn add_line(&self, invoice_id: &str, line: InvoiceLine) -> DbResult<Invoice> {
        let mut invoice = self.require(invoice_id).await?;
        invoice.add_line(line)?;
        self.save_lines(&invoice).await
    }

    /// Replaces the line at `index` and saves.
    pub async fn update_line(
        &self,
        invoice_id: &str,
        index: usize,
        line: InvoiceLine,
    ) -> DbResult<Invoice> {
        let mut invoice = self.require(invoice_id).await?;
        invoice.update_line(index, line)?;
        self.save_lines(&invoice).await
    }

    /// Removes the line at `index` and saves.
    pub async fn remove_line(&self, invoice_id: &str, index: usize) -> DbResult<Invoice> {
        let mut invoice = self.require(invoice_id).await?;
        invoice.remove_line(index)?;
        self.save_lines(&invoice).await
    }

    async fn require(&self, id: &str) -> DbResult<Invoice> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    async fn missing_or_conflict(&self, invoice: &Invoice) -> DbError {
        match self.get_by_id(&invoice.id).await {
            Ok(Some(current)) => {
                warn!(
                    id = %invoice.id,
                    expected = invoice.version,
                    actual = current.version,
                    "Invoice changed since it was read"
                );
                DbError::conflict("Invoice", &invoice.invoice_number, invoice.version)
            }
            Ok(None) => DbError::not_found("Invoice", &invoice.id),
            Err(e) => e,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
