//! # Report Repository
//!
//! Loads the stored documents a dashboard needs and hands them to the
//! aggregation in `tally_core::report`.
//!
//! Returns are loaded alongside sales and count negatively, so every figure
//! is net of returns.

use sqlx::SqlitePool;
use tracing::debug;

use super::invoice::InvoiceRepository;
use super::returns::ReturnRepository;
use crate::error::DbResult;
use tally_core::reference::ReferenceLookup;
use tally_core::report::{self, DateRange, MonthlyBucket, ReportOptions, SalesRecord, SalesReport};

/// Read-only access for reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    invoices: InvoiceRepository,
    returns: ReturnRepository,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository {
            invoices: InvoiceRepository::new(pool.clone()),
            returns: ReturnRepository::new(pool),
        }
    }

    /// Builds every dashboard series for `options.range`.
    pub async fn sales_report<L>(&self, lookup: &L, options: &ReportOptions) -> DbResult<SalesReport>
    where
        L: ReferenceLookup + ?Sized,
    {
        let invoices = self.invoices.list(&options.range).await?;
        let returns = self.returns.list(&options.range).await?;

        debug!(
            invoices = invoices.len(),
            returns = returns.len(),
            "Building sales report"
        );

        Ok(SalesReport::build(&invoices, &returns, lookup, options))
    }

    /// One document-level record per invoice and per return in `range`.
    pub async fn records(&self, range: &DateRange) -> DbResult<Vec<SalesRecord>> {
        let invoices = self.invoices.list(range).await?;
        let returns = self.returns.list(range).await?;

        Ok(invoices
            .iter()
            .map(SalesRecord::from_invoice)
            .chain(returns.iter().map(SalesRecord::from_return))
            .collect())
    }

    /// Twelve month buckets for `year`, net of returns.
    pub async fn monthly(&self, year: i32) -> DbResult<Vec<MonthlyBucket>> {
        let records = self.records(&DateRange::default()).await?;
        Ok(report::monthly(&records, Some(year)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use tally_core::reference::{NoReferences, ReferenceEntry, ReferenceKind};
    use tally_core::returns::{ReturnLineRequest, ReturnRequest};
    use tally_core::report::UNASSIGNED_KEY;
    use tally_core::{Customer, InvoiceDraft, InvoiceLine};

    fn draft(number: &str, month: u32, branch: Option<&str>, lines: Vec<InvoiceLine>) -> InvoiceDraft {
        InvoiceDraft {
            invoice_number: number.to_string(),
            date: NaiveDate::from_ymd_opt(2024, month, 10).unwrap(),
            branch_id: branch.map(str::to_string),
            warehouse_id: None,
            sales_rep: Some("rep-1".to_string()),
            customer: Customer::default(),
            payment_method: Some("cash".to_string()),
            lines,
        }
    }

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let invoices = db.invoices();

        invoices
            .create(draft(
                "INV-1",
                1,
                Some("b-1"),
                vec![InvoiceLine::new("A", "Apples", 10.0, "kg", 10.0, 0.0, 0.0)],
            ))
            .await
            .unwrap();
        invoices
            .create(draft(
                "INV-2",
                2,
                Some("b-2"),
                vec![
                    InvoiceLine::new("B", "Bread", 2.0, "pcs", 25.0, 0.0, 0.0),
                    InvoiceLine::new("A", "Apples", 1.0, "kg", 10.0, 0.0, 0.0),
                ],
            ))
            .await
            .unwrap();
        invoices
            .create(draft(
                "INV-3",
                2,
                None,
                vec![InvoiceLine::new("C", "Cheese", 1.0, "pcs", 30.0, 0.0, 0.0)],
            ))
            .await
            .unwrap();

        db.returns()
            .submit(&ReturnRequest {
                reference_number: "RET-1".to_string(),
                original_invoice_number: "INV-1".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 2, 20).unwrap(),
                warehouse_id: None,
                lines: vec![ReturnLineRequest {
                    item_number: "A".to_string(),
                    line_index: None,
                    returned_qty: 3.0,
                }],
            })
            .await
            .unwrap();

        db
    }

    #[tokio::test]
    async fn test_report_is_net_of_returns() {
        let db = seeded().await;
        db.references()
            .upsert(
                ReferenceKind::Branch,
                &ReferenceEntry {
                    id: "b-1".to_string(),
                    name: "Downtown".to_string(),
                },
            )
            .await
            .unwrap();
        let refs = db.reference_cache().await.unwrap();

        let report = db
            .reports()
            .sales_report(&refs, &ReportOptions::default())
            .await
            .unwrap();

        // 100 + 60 + 30 sold, 30 returned
        assert_eq!(report.summary.net_total.cents(), 16000);
        assert_eq!(report.summary.count, 4);

        let branches: Vec<_> = report
            .by_branch
            .iter()
            .map(|a| (a.key.as_str(), a.label.as_str(), a.net_total.cents()))
            .collect();
        assert_eq!(
            branches,
            [
                ("b-1", "Downtown", 7000),
                ("b-2", "b-2", 6000),
                (UNASSIGNED_KEY, "Unassigned", 3000),
            ]
        );

        // Apples: 10 + 1 sold − 3 returned
        assert_eq!(report.top_items[0].key, "A");
        assert_eq!(report.top_items[0].label, "Apples");
        assert_eq!(report.top_items[0].total_quantity, 8.0);

        assert_eq!(report.top_sales_reps.len(), 1);
        assert_eq!(report.by_payment_method[0].key, "cash");
    }

    #[tokio::test]
    async fn test_report_range_filters_documents() {
        let db = seeded().await;
        let options = ReportOptions {
            range: DateRange {
                from: NaiveDate::from_ymd_opt(2024, 2, 1),
                to: NaiveDate::from_ymd_opt(2024, 2, 29),
            },
            ..ReportOptions::default()
        };

        let report = db.reports().sales_report(&NoReferences, &options).await.unwrap();
        // INV-2 and INV-3 plus the February return of INV-1
        assert_eq!(report.summary.count, 3);
        assert_eq!(report.summary.net_total.cents(), 6000 + 3000 - 3000);
    }

    #[tokio::test]
    async fn test_monthly_buckets() {
        let db = seeded().await;
        let months = db.reports().monthly(2024).await.unwrap();

        assert_eq!(months.len(), 12);
        assert_eq!(months[0].metrics.net_total.cents(), 10000);
        assert_eq!(months[1].metrics.net_total.cents(), 6000);
        assert!(months[2..].iter().all(|m| m.metrics.count == 0));

        assert!(db
            .reports()
            .monthly(2023)
            .await
            .unwrap()
            .iter()
            .all(|m| m.metrics.count == 0));
    }

    #[tokio::test]
    async fn test_records_carry_sign() {
        let db = seeded().await;
        let records = db.reports().records(&DateRange::default()).await.unwrap();

        assert_eq!(records.len(), 4);
        let summary = report::summary(&records);
        assert_eq!(summary.net_total.cents(), 16000);
    }
}
