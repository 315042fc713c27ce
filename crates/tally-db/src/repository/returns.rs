//! # Return Repository
//!
//! Stores sales returns and keeps each original invoice's returned
//! quantities in step with them.
//!
//! ## Submit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Return Submission                                │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├── load original invoice by number (version n)                     │
//! │    ├── reconcile every requested line (tally-core, all-or-nothing)     │
//! │    ├── UPDATE invoices ... version = n + 1 WHERE id = ? AND version = n│
//! │    │       └── 0 rows → Conflict, ROLLBACK                             │
//! │    ├── INSERT return document                                          │
//! │    │       └── duplicate reference → UniqueViolation, ROLLBACK         │
//! │    │                                                                    │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Either both the updated invoice and the return document are stored,   │
//! │  or neither is.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::invoice::{fetch_by_number, write_lines};
use crate::error::{DbError, DbResult};
use tally_core::report::DateRange;
use tally_core::returns::{reconcile_batch, ReturnRequest};
use tally_core::{InvoiceTotals, Money, ReturnLine, ReturnRecord};

const RETURN_COLUMNS: &str = "id, reference_number, original_invoice_id, \
     original_invoice_number, return_date, warehouse_id, branch_id, sales_rep, \
     payment_method, items, total_cents, discount_cents, after_discount_cents, \
     tax_cents, net_cents, created_at";

/// One row of the `returns` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ReturnRow {
    id: String,
    reference_number: String,
    original_invoice_id: String,
    original_invoice_number: String,
    return_date: NaiveDate,
    warehouse_id: Option<String>,
    branch_id: Option<String>,
    sales_rep: Option<String>,
    payment_method: Option<String>,
    items: String,
    total_cents: i64,
    discount_cents: i64,
    after_discount_cents: i64,
    tax_cents: i64,
    net_cents: i64,
    created_at: DateTime<Utc>,
}

impl ReturnRow {
    fn into_record(self) -> DbResult<ReturnRecord> {
        let lines: Vec<ReturnLine> = serde_json::from_str(&self.items)?;

        Ok(ReturnRecord {
            id: self.id,
            reference_number: self.reference_number,
            original_invoice_id: self.original_invoice_id,
            original_invoice_number: self.original_invoice_number,
            date: self.return_date,
            warehouse_id: self.warehouse_id,
            branch_id: self.branch_id,
            sales_rep: self.sales_rep,
            payment_method: self.payment_method,
            lines,
            totals: InvoiceTotals {
                total: Money::from_cents(self.total_cents),
                discount: Money::from_cents(self.discount_cents),
                after_discount: Money::from_cents(self.after_discount_cents),
                tax: Money::from_cents(self.tax_cents),
                net: Money::from_cents(self.net_cents),
            },
            created_at: self.created_at,
        })
    }
}

async fn insert_return<'e, E>(executor: E, record: &ReturnRecord) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let items = serde_json::to_string(&record.lines)?;
    let totals = &record.totals;

    sqlx::query(
        r#"
        INSERT INTO returns (
            id, reference_number, original_invoice_id, original_invoice_number,
            return_date, warehouse_id, branch_id, sales_rep, payment_method,
            items,
            total_cents, discount_cents, after_discount_cents, tax_cents, net_cents,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&record.id)
    .bind(&record.reference_number)
    .bind(&record.original_invoice_id)
    .bind(&record.original_invoice_number)
    .bind(record.date)
    .bind(&record.warehouse_id)
    .bind(&record.branch_id)
    .bind(&record.sales_rep)
    .bind(&record.payment_method)
    .bind(items)
    .bind(totals.total.cents())
    .bind(totals.discount.cents())
    .bind(totals.after_discount.cents())
    .bind(totals.tax.cents())
    .bind(totals.net.cents())
    .bind(record.created_at)
    .execute(executor)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => {
            DbError::duplicate("reference_number", &record.reference_number)
        }
        other => other,
    })?;

    Ok(())
}

/// Repository for sales return documents.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Records a return against the invoice it names.
    ///
    /// ## Errors
    /// - `DbError::NotFound` when the invoice number is unknown
    /// - `DbError::Domain` when any line is rejected; every failing line is
    ///   listed and nothing is written
    /// - `DbError::UniqueViolation` when the reference number is taken
    /// - `DbError::Conflict` when the invoice changed during the submit
    pub async fn submit(&self, request: &ReturnRequest) -> DbResult<ReturnRecord> {
        self.submit_checked(request, None).await
    }

    /// Like [`submit`](Self::submit), but only if the invoice is still at
    /// `expected_version`, the version the caller showed the user.
    pub async fn submit_at_version(
        &self,
        request: &ReturnRequest,
        expected_version: i64,
    ) -> DbResult<ReturnRecord> {
        self.submit_checked(request, Some(expected_version)).await
    }

    async fn submit_checked(
        &self,
        request: &ReturnRequest,
        expected_version: Option<i64>,
    ) -> DbResult<ReturnRecord> {
        let number = request.original_invoice_number.trim();
        debug!(
            reference = %request.reference_number,
            invoice_number = %number,
            lines = request.lines.len(),
            "Submitting return"
        );

        // Dropping `tx` on any early return rolls back.
        let mut tx = self.pool.begin().await?;

        let mut invoice = fetch_by_number(&mut *tx, number)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", number))?;

        if let Some(expected) = expected_version {
            if invoice.version != expected {
                warn!(
                    invoice_number = %number,
                    expected,
                    actual = invoice.version,
                    "Return submitted against a stale invoice"
                );
                return Err(DbError::conflict("Invoice", number, expected));
            }
        }

        let plan = reconcile_batch(&invoice, request)?;
        plan.apply(&mut invoice)?;

        let now = Utc::now();
        let returned_qty = plan.returned_quantity();
        let record = plan.into_record(&invoice, Uuid::new_v4().to_string(), now)?;

        if !write_lines(&mut *tx, &invoice, now).await? {
            warn!(invoice_number = %number, version = invoice.version, "Invoice changed during return");
            return Err(DbError::conflict("Invoice", number, invoice.version));
        }

        insert_return(&mut *tx, &record).await?;
        tx.commit().await?;

        info!(
            reference = %record.reference_number,
            invoice_number = %record.original_invoice_number,
            lines = record.lines.len(),
            quantity = returned_qty,
            net = %record.totals.net,
            "Return recorded"
        );
        Ok(record)
    }

    /// Gets a return by its reference number.
    pub async fn get_by_reference(&self, reference: &str) -> DbResult<Option<ReturnRecord>> {
        let sql = format!("SELECT {RETURN_COLUMNS} FROM returns WHERE reference_number = ?1");
        let row: Option<ReturnRow> = sqlx::query_as(&sql)
            .bind(reference.trim())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ReturnRow::into_record).transpose()
    }

    /// Lists returns dated inside `range`, oldest first.
    pub async fn list(&self, range: &DateRange) -> DbResult<Vec<ReturnRecord>> {
        let sql = format!(
            "SELECT {RETURN_COLUMNS} FROM returns \
             WHERE (?1 IS NULL OR return_date >= ?1) AND (?2 IS NULL OR return_date <= ?2) \
             ORDER BY return_date, reference_number"
        );
        let rows: Vec<ReturnRow> = sqlx::query_as(&sql)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ReturnRow::into_record).collect()
    }

    /// Lists every return made against one invoice.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<ReturnRecord>> {
        let sql = format!(
            "SELECT {RETURN_COLUMNS} FROM returns WHERE original_invoice_id = ?1 \
             ORDER BY created_at"
        );
        let rows: Vec<ReturnRow> = sqlx::query_as(&sql)
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ReturnRow::into_record).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
