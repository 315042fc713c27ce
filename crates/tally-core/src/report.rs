//! # Reporting Aggregator
//!
//! Groups sales records by a key, sums their money fields and ranks the
//! groups for the dashboard charts.
//!
//! ## Report Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  invoices ──► SalesRecord (+1) ─┐                                       │
//! │                                 ├──► filter (year / date range)         │
//! │  returns  ──► SalesRecord (−1) ─┘             │                         │
//! │                                               ▼                         │
//! │                          group_and_sum(records, key_fn)                 │
//! │                                               │                         │
//! │                     ┌─────────────┬───────────┼─────────────┐           │
//! │                     ▼             ▼           ▼             ▼           │
//! │                 by_branch     by_item    by_sales_rep    monthly        │
//! │                  (labels)    top_n(15)    top_n(15)   12 fixed buckets  │
//! │                                                                         │
//! │  Missing metric fields count as 0. Nothing here is persisted; the       │
//! │  report is recomputed on every fetch.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;
use crate::normalize::{normalize_line_records, normalize_sales_record};
use crate::reference::{ReferenceKind, ReferenceLookup};
use crate::types::{Invoice, InvoiceKind, ReturnRecord};
use crate::{TOP_ITEMS_LIMIT, TOP_REPS_LIMIT};

/// Group key for records without a branch, rep or payment method.
pub const UNASSIGNED_KEY: &str = "unassigned";

const UNASSIGNED_LABEL: &str = "Unassigned";

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// =============================================================================
// Sales Records
// =============================================================================

/// One reportable fact: a whole document or a single line of it.
///
/// Every field is optional because records may come from loosely-shaped
/// documents. Missing metrics contribute 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesRecord {
    #[serde(default)]
    pub kind: InvoiceKind,
    pub document_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    pub branch_id: Option<String>,
    pub sales_rep: Option<String>,
    pub payment_method: Option<String>,
    pub item_number: Option<String>,
    pub item_name: Option<String>,
    pub quantity: Option<f64>,
    pub total: Option<Money>,
    pub discount: Option<Money>,
    pub tax: Option<Money>,
    pub net: Option<Money>,
}

impl SalesRecord {
    /// Document-level record for a sale invoice.
    pub fn from_invoice(invoice: &Invoice) -> Self {
        SalesRecord {
            kind: InvoiceKind::Sale,
            document_number: Some(invoice.invoice_number.clone()),
            date: Some(invoice.date),
            branch_id: invoice.branch_id.clone(),
            sales_rep: invoice.sales_rep.clone(),
            payment_method: invoice.payment_method.clone(),
            item_number: None,
            item_name: None,
            quantity: Some(invoice.lines.iter().map(|l| l.quantity).sum()),
            total: Some(invoice.totals.total),
            discount: Some(invoice.totals.discount),
            tax: Some(invoice.totals.tax),
            net: Some(invoice.totals.net),
        }
    }

    /// One record per invoice line.
    pub fn lines_of_invoice(invoice: &Invoice) -> Vec<Self> {
        let header = SalesRecord::from_invoice(invoice);
        invoice
            .lines
            .iter()
            .map(|line| SalesRecord {
                item_number: Some(line.item_number.clone()),
                item_name: Some(line.item_name.clone()),
                quantity: Some(line.quantity),
                total: Some(line.line_total),
                discount: Some(line.discount_value),
                tax: Some(line.tax_value),
                net: Some(line.net()),
                ..header.clone()
            })
            .collect()
    }

    /// Document-level record for a return. Folds into reports negatively.
    pub fn from_return(record: &ReturnRecord) -> Self {
        SalesRecord {
            kind: InvoiceKind::Return,
            document_number: Some(record.reference_number.clone()),
            date: Some(record.date),
            branch_id: record.branch_id.clone(),
            sales_rep: record.sales_rep.clone(),
            payment_method: record.payment_method.clone(),
            item_number: None,
            item_name: None,
            quantity: Some(record.lines.iter().map(|l| l.returned_qty).sum()),
            total: Some(record.totals.total),
            discount: Some(record.totals.discount),
            tax: Some(record.totals.tax),
            net: Some(record.totals.net),
        }
    }

    /// One record per returned line.
    pub fn lines_of_return(record: &ReturnRecord) -> Vec<Self> {
        let header = SalesRecord::from_return(record);
        record
            .lines
            .iter()
            .map(|line| SalesRecord {
                item_number: Some(line.item_number.clone()),
                item_name: Some(line.item_name.clone()),
                quantity: Some(line.returned_qty),
                total: Some(line.line_total),
                discount: Some(line.discount_value),
                tax: Some(line.tax_value),
                net: Some(line.net()),
                ..header.clone()
            })
            .collect()
    }
}

// =============================================================================
// Grouping
// =============================================================================

/// Signed sums over a group of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_sales: Money,
    pub total_discount: Money,
    pub total_tax: Money,
    pub net_total: Money,
    pub total_quantity: f64,
    pub count: usize,
}

impl Metrics {
    /// Folds one record in, applying its kind's sign.
    pub fn add(&mut self, record: &SalesRecord) {
        let sign = record.kind.sign();
        let money = |m: Option<Money>| m.unwrap_or_default().signed(sign);

        self.total_sales += money(record.total);
        self.total_discount += money(record.discount);
        self.total_tax += money(record.tax);
        self.net_total += money(record.net);
        self.total_quantity += record
            .quantity
            .filter(|q| q.is_finite())
            .unwrap_or(0.0)
            * sign as f64;
        self.count += 1;
    }
}

/// Groups records by `key_fn` and sums each group.
///
/// Records for which `key_fn` returns `None` are left out.
///
/// ## Example
/// ```rust
/// use tally_core::report::{group_and_sum, SalesRecord};
///
/// let empty: Vec<SalesRecord> = Vec::new();
/// assert!(group_and_sum(&empty, |r| r.branch_id.clone()).is_empty());
/// ```
pub fn group_and_sum<'a, K, I, F>(records: I, key_fn: F) -> BTreeMap<K, Metrics>
where
    K: Ord,
    I: IntoIterator<Item = &'a SalesRecord>,
    F: Fn(&SalesRecord) -> Option<K>,
{
    let mut groups: BTreeMap<K, Metrics> = BTreeMap::new();
    for record in records {
        if let Some(key) = key_fn(record) {
            groups.entry(key).or_default().add(record);
        }
    }
    groups
}

/// Sums every record.
pub fn summary<'a, I>(records: I) -> Metrics
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    records.into_iter().fold(Metrics::default(), |mut m, r| {
        m.add(r);
        m
    })
}

// =============================================================================
// Aggregates and Ranking
// =============================================================================

/// One labelled group of a report.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReportAggregate {
    pub key: String,
    pub label: String,
    pub total_sales: Money,
    pub total_discount: Money,
    pub total_tax: Money,
    pub net_total: Money,
    pub total_quantity: f64,
    pub count: usize,
}

impl ReportAggregate {
    pub fn new(key: String, label: String, metrics: Metrics) -> Self {
        ReportAggregate {
            key,
            label,
            total_sales: metrics.total_sales,
            total_discount: metrics.total_discount,
            total_tax: metrics.total_tax,
            net_total: metrics.net_total,
            total_quantity: metrics.total_quantity,
            count: metrics.count,
        }
    }
}

/// Metric a ranking sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    NetTotal,
    TotalSales,
    Quantity,
    Count,
}

impl RankBy {
    fn compare(&self, a: &ReportAggregate, b: &ReportAggregate) -> Ordering {
        match self {
            RankBy::NetTotal => a.net_total.cmp(&b.net_total),
            RankBy::TotalSales => a.total_sales.cmp(&b.total_sales),
            RankBy::Quantity => a.total_quantity.total_cmp(&b.total_quantity),
            RankBy::Count => a.count.cmp(&b.count),
        }
    }
}

/// Sorts by `rank` descending, ties by key ascending, and keeps the first `n`.
///
/// ## Example
/// ```rust
/// use tally_core::report::{top_n, Metrics, RankBy, ReportAggregate};
/// use tally_core::Money;
///
/// let group = |key: &str, cents| {
///     let metrics = Metrics { net_total: Money::from_cents(cents), ..Metrics::default() };
///     ReportAggregate::new(key.to_string(), key.to_string(), metrics)
/// };
/// let top = top_n(vec![group("a", 10), group("b", 30), group("c", 20)], RankBy::NetTotal, 2);
///
/// let keys: Vec<_> = top.iter().map(|g| g.key.as_str()).collect();
/// assert_eq!(keys, ["b", "c"]);
/// ```
pub fn top_n(mut aggregates: Vec<ReportAggregate>, rank: RankBy, n: usize) -> Vec<ReportAggregate> {
    aggregates.sort_by(|a, b| rank.compare(b, a).then_with(|| a.key.cmp(&b.key)));
    aggregates.truncate(n);
    aggregates
}

fn labelled<L>(
    groups: BTreeMap<String, Metrics>,
    kind: ReferenceKind,
    lookup: &L,
) -> Vec<ReportAggregate>
where
    L: ReferenceLookup + ?Sized,
{
    groups
        .into_iter()
        .map(|(key, metrics)| {
            let label = if key == UNASSIGNED_KEY {
                UNASSIGNED_LABEL.to_string()
            } else {
                lookup.label(kind, &key)
            };
            ReportAggregate::new(key, label, metrics)
        })
        .collect()
}

fn key_or_unassigned(value: &Option<String>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => Some(UNASSIGNED_KEY.to_string()),
    }
}

/// Net sales per branch, largest first, labelled with branch names.
pub fn by_branch<L>(records: &[SalesRecord], lookup: &L) -> Vec<ReportAggregate>
where
    L: ReferenceLookup + ?Sized,
{
    let groups = group_and_sum(records, |r| key_or_unassigned(&r.branch_id));
    let all = groups.len();
    top_n(labelled(groups, ReferenceKind::Branch, lookup), RankBy::NetTotal, all)
}

/// Net sales per payment method, largest first.
pub fn by_payment_method<L>(records: &[SalesRecord], lookup: &L) -> Vec<ReportAggregate>
where
    L: ReferenceLookup + ?Sized,
{
    let groups = group_and_sum(records, |r| key_or_unassigned(&r.payment_method));
    let all = groups.len();
    top_n(
        labelled(groups, ReferenceKind::PaymentMethod, lookup),
        RankBy::NetTotal,
        all,
    )
}

/// Top `n` sales representatives by net sales.
pub fn by_sales_rep<L>(records: &[SalesRecord], lookup: &L, n: usize) -> Vec<ReportAggregate>
where
    L: ReferenceLookup + ?Sized,
{
    let groups = group_and_sum(records, |r| key_or_unassigned(&r.sales_rep));
    top_n(labelled(groups, ReferenceKind::SalesRep, lookup), RankBy::NetTotal, n)
}

/// Top `n` items by units sold. Only line-level records carry an item.
pub fn by_item(records: &[SalesRecord], n: usize) -> Vec<ReportAggregate> {
    let mut names: BTreeMap<&str, &str> = BTreeMap::new();
    for record in records {
        if let (Some(number), Some(name)) = (&record.item_number, &record.item_name) {
            names.entry(number.as_str()).or_insert(name.as_str());
        }
    }

    let groups = group_and_sum(records, |r| r.item_number.clone());
    let aggregates = groups
        .into_iter()
        .map(|(key, metrics)| {
            let label = names.get(key.as_str()).map_or_else(|| key.clone(), |n| n.to_string());
            ReportAggregate::new(key, label, metrics)
        })
        .collect();
    top_n(aggregates, RankBy::Quantity, n)
}

// =============================================================================
// Dates and Months
// =============================================================================

/// Parses the date formats found in stored documents.
///
/// Accepts RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS[.fff]]`,
/// `YYYY-MM-DD HH:MM:SS`, `YYYY/MM/DD` and `DD/MM/YYYY`.
///
/// ## Example
/// ```rust
/// use tally_core::report::parse_date;
///
/// assert!(parse_date("2024-03-14").is_some());
/// assert!(parse_date("14/03/2024").is_some());
/// assert!(parse_date("not a date").is_none());
/// ```
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    const DATE_TIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Inclusive date range. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Whether `date` lies inside the range. Undated records are outside any
    /// bounded range.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        match date {
            Some(d) => self.from.map_or(true, |f| d >= f) && self.to.map_or(true, |t| d <= t),
            None => false,
        }
    }
}

/// One calendar month of the monthly chart.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    /// 1 = January.
    pub month: u32,
    pub label: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// Sums records into 12 fixed month buckets.
///
/// Records without a date are left out. With `year`, only that year's
/// records count; without it, months of different years are merged.
pub fn monthly(records: &[SalesRecord], year: Option<i32>) -> Vec<MonthlyBucket> {
    let groups = group_and_sum(records, |r| {
        r.date
            .filter(|d| year.map_or(true, |y| d.year() == y))
            .map(|d| d.month())
    });

    (1..=12u32)
        .map(|month| MonthlyBucket {
            month,
            label: MONTH_LABELS[(month - 1) as usize].to_string(),
            metrics: groups.get(&month).copied().unwrap_or_default(),
        })
        .collect()
}

// =============================================================================
// Sales Report
// =============================================================================

/// What a dashboard fetch asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReportOptions {
    pub top_items: usize,
    pub top_reps: usize,
    /// Year for the monthly chart.
    pub year: Option<i32>,
    #[serde(default)]
    pub range: DateRange,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            top_items: TOP_ITEMS_LIMIT,
            top_reps: TOP_REPS_LIMIT,
            year: None,
            range: DateRange::default(),
        }
    }
}

/// Every series of the sales dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub summary: Metrics,
    pub by_branch: Vec<ReportAggregate>,
    pub by_payment_method: Vec<ReportAggregate>,
    pub top_items: Vec<ReportAggregate>,
    pub top_sales_reps: Vec<ReportAggregate>,
    pub monthly: Vec<MonthlyBucket>,
}

impl SalesReport {
    /// Builds the dashboard from sale invoices minus returns.
    pub fn build<L>(
        invoices: &[Invoice],
        returns: &[ReturnRecord],
        lookup: &L,
        options: &ReportOptions,
    ) -> Self
    where
        L: ReferenceLookup + ?Sized,
    {
        let documents = invoices
            .iter()
            .map(SalesRecord::from_invoice)
            .chain(returns.iter().map(SalesRecord::from_return));

        let lines = invoices
            .iter()
            .flat_map(SalesRecord::lines_of_invoice)
            .chain(returns.iter().flat_map(SalesRecord::lines_of_return));

        Self::from_records(documents, lines, lookup, options)
    }

    /// Builds the dashboard from loosely-shaped sale and return documents,
    /// such as a legacy export that was never imported.
    ///
    /// Each document is read through [`normalize_sales_record`]; its items
    /// become the line records behind the top-items chart.
    pub fn from_documents<L>(documents: &[Value], lookup: &L, options: &ReportOptions) -> Self
    where
        L: ReferenceLookup + ?Sized,
    {
        let mut headers = Vec::with_capacity(documents.len());
        let mut lines = Vec::new();

        for doc in documents {
            let mut header = normalize_sales_record(doc);
            let items = normalize_line_records(doc);
            if header.quantity.is_none() && !items.is_empty() {
                header.quantity = Some(items.iter().filter_map(|l| l.quantity).sum());
            }
            headers.push(header);
            lines.extend(items);
        }

        Self::from_records(headers, lines, lookup, options)
    }

    /// Builds the dashboard from document-level and line-level records.
    ///
    /// Records outside `options.range` are dropped first.
    pub fn from_records<L, D, I>(documents: D, lines: I, lookup: &L, options: &ReportOptions) -> Self
    where
        L: ReferenceLookup + ?Sized,
        D: IntoIterator<Item = SalesRecord>,
        I: IntoIterator<Item = SalesRecord>,
    {
        let in_range = |r: &SalesRecord| options.range.contains(r.date);
        let documents: Vec<SalesRecord> = documents.into_iter().filter(in_range).collect();
        let lines: Vec<SalesRecord> = lines.into_iter().filter(in_range).collect();

        SalesReport {
            summary: summary(&documents),
            by_branch: by_branch(&documents, lookup),
            by_payment_method: by_payment_method(&documents, lookup),
            top_items: by_item(&lines, options.top_items),
            top_sales_reps: by_sales_rep(&documents, lookup, options.top_reps),
            monthly: monthly(&documents, options.year),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{NoReferences, ReferenceData};
    use serde_json::json;

    fn record(date: &str, net: i64) -> SalesRecord {
        SalesRecord {
            date: parse_date(date),
            net: Some(Money::from_cents(net)),
            total: Some(Money::from_cents(net)),
            ..SalesRecord::default()
        }
    }

    #[test]
    fn test_group_and_sum_empty() {
        let empty: Vec<SalesRecord> = Vec::new();
        assert!(group_and_sum(&empty, |r| r.branch_id.clone()).is_empty());
        assert_eq!(summary(&empty), Metrics::default());
    }

    #[test]
    fn test_missing_metric_counts_as_zero() {
        let records = vec![
            SalesRecord {
                branch_id: Some("b-1".into()),
                net: Some(Money::from_cents(500)),
                ..SalesRecord::default()
            },
            SalesRecord {
                branch_id: Some("b-1".into()),
                net: None,
                quantity: Some(f64::NAN),
                ..SalesRecord::default()
            },
        ];
        let groups = group_and_sum(&records, |r| r.branch_id.clone());
        let b1 = groups["b-1"];
        assert_eq!(b1.net_total.cents(), 500);
        assert_eq!(b1.total_tax.cents(), 0);
        assert_eq!(b1.total_quantity, 0.0);
        assert_eq!(b1.count, 2);
    }

    #[test]
    fn test_returns_fold_negatively() {
        let sale = record("2024-01-10", 10_000);
        let ret = SalesRecord {
            kind: InvoiceKind::Return,
            ..record("2024-01-12", 2_500)
        };
        let total = summary(&[sale, ret]);
        assert_eq!(total.net_total.cents(), 7_500);
        assert_eq!(total.count, 2);
    }

    #[test]
    fn test_monthly_twelve_buckets() {
        let records = vec![
            record("2024-01-05", 100),
            record("2024-01-25T10:30:00Z", 50),
            record("2024/03/01", 200),
            record("15/07/2024", 300),
            record("not a date", 999),
            record("2023-03-09", 777),
        ];

        let months = monthly(&records, Some(2024));
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].metrics.net_total.cents(), 150);
        assert_eq!(months[2].metrics.net_total.cents(), 200);
        assert_eq!(months[6].metrics.net_total.cents(), 300);
        assert_eq!(months[6].label, "Jul");

        let touched = [0usize, 2, 6];
        for (i, bucket) in months.iter().enumerate() {
            if !touched.contains(&i) {
                assert_eq!(bucket.metrics, Metrics::default(), "month {}", i + 1);
            }
        }

        let all_years = monthly(&records, None);
        assert_eq!(all_years[2].metrics.net_total.cents(), 977);
    }

    #[test]
    fn test_top_15_of_20() {
        let aggregates: Vec<ReportAggregate> = (1..=20)
            .map(|i| {
                let metrics = Metrics {
                    net_total: Money::from_cents(i * 100),
                    ..Metrics::default()
                };
                ReportAggregate::new(format!("rep-{i:02}"), format!("Rep {i}"), metrics)
            })
            .collect();

        let top = top_n(aggregates, RankBy::NetTotal, 15);
        assert_eq!(top.len(), 15);
        let nets: Vec<i64> = top.iter().map(|a| a.net_total.cents()).collect();
        let expected: Vec<i64> = (6..=20).rev().map(|i| i * 100).collect();
        assert_eq!(nets, expected);
    }

    #[test]
    fn test_top_n_ties_break_by_key() {
        let m = Metrics {
            net_total: Money::from_cents(100),
            ..Metrics::default()
        };
        let top = top_n(
            vec![
                ReportAggregate::new("c".into(), "c".into(), m),
                ReportAggregate::new("a".into(), "a".into(), m),
                ReportAggregate::new("b".into(), "b".into(), m),
            ],
            RankBy::NetTotal,
            10,
        );
        let keys: Vec<_> = top.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_by_branch_uses_labels() {
        let mut refs = ReferenceData::new();
        refs.insert(ReferenceKind::Branch, "b-1", "Riyadh");

        let records = vec![
            SalesRecord {
                branch_id: Some("b-1".into()),
                net: Some(Money::from_cents(100)),
                ..SalesRecord::default()
            },
            SalesRecord {
                branch_id: Some("b-2".into()),
                net: Some(Money::from_cents(300)),
                ..SalesRecord::default()
            },
            SalesRecord {
                net: Some(Money::from_cents(50)),
                ..SalesRecord::default()
            },
        ];

        let groups = by_branch(&records, &refs);
        let labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["b-2", "Riyadh", "Unassigned"]);

        let plain = by_branch(&records, &NoReferences);
        assert_eq!(plain[1].label, "b-1");
    }

    #[test]
    fn test_by_item_ranks_by_quantity() {
        let item = |number: &str, qty: f64| SalesRecord {
            item_number: Some(number.into()),
            item_name: Some(format!("Item {number}")),
            quantity: Some(qty),
            ..SalesRecord::default()
        };
        let records = vec![item("A", 2.0), item("B", 5.0), item("A", 4.0), item("C", 1.0)];

        let top = by_item(&records, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "A");
        assert_eq!(top[0].total_quantity, 6.0);
        assert_eq!(top[0].label, "Item A");
        assert_eq!(top[1].key, "B");
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        for raw in [
            "2024-03-14",
            "2024-03-14T09:15",
            "2024-03-14T09:15:30",
            "2024-03-14T09:15:30.250",
            "2024-03-14 09:15:30",
            "2024-03-14T09:15:30+03:00",
            "2024/03/14",
            "14/03/2024",
        ] {
            assert_eq!(parse_date(raw), Some(d), "{raw}");
        }
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-13-40"), None);
    }

    #[test]
    fn test_date_range() {
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: NaiveDate::from_ymd_opt(2024, 1, 31),
        };
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 1, 31)));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 2, 1)));
        assert!(!range.contains(None));
        assert!(DateRange::default().contains(None));
    }

    #[test]
    fn test_report_from_loose_documents() {
        let docs = vec![
            json!({
                "invoiceNo": "INV-1",
                "date": "2024-01-05",
                "branchId": "b-1",
                "items": [{ "sku": "A", "name": "Apples", "qty": 10, "price": 10 }],
                "totals": { "total": 100, "net": 100 }
            }),
            json!({
                "invoiceNumber": "INV-2",
                "date": "02/02/2024",
                "branch": "b-1",
                "items": [{ "sku": "B", "qty": 2, "price": 25 }],
                "net": "50"
            }),
            json!({
                "type": "return",
                "referenceNumber": "RET-1",
                "date": "2024-02-10",
                "branchId": "b-1",
                "items": [{ "sku": "A", "quantity": 10, "returnedQty": 3, "price": 10 }],
                "net": 30
            }),
            json!({ "invoiceNumber": "INV-X", "date": "??", "net": 999 }),
        ];
        let options = ReportOptions {
            year: Some(2024),
            range: DateRange {
                from: NaiveDate::from_ymd_opt(2024, 1, 1),
                to: NaiveDate::from_ymd_opt(2024, 12, 31),
            },
            ..ReportOptions::default()
        };

        let report = SalesReport::from_documents(&docs, &NoReferences, &options);

        assert_eq!(report.summary.count, 3);
        assert_eq!(report.summary.net_total.cents(), 12000);
        assert_eq!(report.summary.total_quantity, 10.0 + 2.0 - 3.0);

        assert_eq!(report.by_branch.len(), 1);
        assert_eq!(report.by_branch[0].net_total.cents(), 12000);

        assert_eq!(report.top_items[0].key, "A");
        assert_eq!(report.top_items[0].total_quantity, 7.0);
        assert_eq!(report.top_items[0].net_total.cents(), 7000);
        assert_eq!(report.top_items[1].key, "B");

        assert_eq!(report.monthly[0].metrics.net_total.cents(), 10000);
        assert_eq!(report.monthly[1].metrics.net_total.cents(), 2000);
    }
}
