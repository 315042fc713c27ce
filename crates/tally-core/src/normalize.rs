//! # Document Normalization
//!
//! The one place that reads loosely-shaped JSON documents. Older documents
//! name the same field in different ways (`phone`, `mobile`, `tel`, ...);
//! each field has a priority-ordered list of names, tried first to last.
//!
//! ## Adapter Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  JSON import / legacy document                                          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  normalize_* (THIS MODULE)                                              │
//! │  ├── first matching field name wins (nested paths: "customer.phone")    │
//! │  ├── numeric strings are accepted as numbers                            │
//! │  └── missing numbers become 0, missing text becomes None                │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  InvoiceDraft / Invoice / SalesRecord (strongly typed from here on)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::report::{parse_date, SalesRecord};
use crate::types::{Customer, Invoice, InvoiceDraft, InvoiceKind, InvoiceLine};

// =============================================================================
// Field Lists
// =============================================================================

pub const INVOICE_NUMBER_FIELDS: &[&str] = &["invoiceNumber", "invoiceNo", "invoice_number", "number"];
pub const REFERENCE_NUMBER_FIELDS: &[&str] = &["referenceNumber", "returnNumber", "reference"];
pub const DATE_FIELDS: &[&str] = &["date", "invoiceDate", "returnDate", "createdAt", "created_at"];
pub const BRANCH_FIELDS: &[&str] = &["branchId", "branch.id", "branch", "branch_id"];
pub const WAREHOUSE_FIELDS: &[&str] = &["warehouseId", "warehouse.id", "warehouse", "storeId"];
pub const SALES_REP_FIELDS: &[&str] = &["salesRep", "salesRepId", "salesRep.id", "salesman", "representative"];
pub const PAYMENT_METHOD_FIELDS: &[&str] = &["paymentMethod", "paymentMethodId", "paymentMethod.id", "paymentType", "payment"];
pub const CUSTOMER_NAME_FIELDS: &[&str] = &["customerName", "customer.name", "clientName", "customer"];
pub const CUSTOMER_PHONE_FIELDS: &[&str] = &[
    "customerPhone",
    "phone",
    "phoneNumber",
    "mobile",
    "mobileNumber",
    "tel",
    "customer.phone",
];
pub const LINES_FIELDS: &[&str] = &["items", "lines", "products"];
pub const KIND_FIELDS: &[&str] = &["kind", "type", "invoiceType"];

pub const ITEM_NUMBER_FIELDS: &[&str] = &["itemNumber", "itemCode", "code", "sku", "productId"];
pub const ITEM_NAME_FIELDS: &[&str] = &["itemName", "name", "productName", "description"];
pub const QUANTITY_FIELDS: &[&str] = &["quantity", "qty", "count"];
pub const RETURNED_QTY_FIELDS: &[&str] = &["returnedQty", "returnQty", "returnedQuantity"];
pub const UNIT_FIELDS: &[&str] = &["unit", "unitName", "uom"];
pub const UNIT_PRICE_FIELDS: &[&str] = &["unitPrice", "price", "salePrice"];
pub const DISCOUNT_PERCENT_FIELDS: &[&str] = &["discountPercent", "discountRate"];
pub const TAX_PERCENT_FIELDS: &[&str] = &["taxPercent", "taxRate", "vat"];
pub const PREVIOUS_RETURNS_FIELDS: &[&str] = &["previousReturns", "previous_returns", "returned"];

pub const TOTAL_FIELDS: &[&str] = &["totals.total", "total", "totalSales", "lineTotal"];
// Bare "discount" and "tax" hold amounts in older documents, never rates
pub const DISCOUNT_VALUE_FIELDS: &[&str] = &["totals.discount", "totalDiscount", "discountValue", "discount"];
pub const TAX_VALUE_FIELDS: &[&str] = &["totals.tax", "totalTax", "taxValue", "tax"];
pub const NET_FIELDS: &[&str] = &["totals.net", "net", "netTotal", "grandTotal"];

// =============================================================================
// Field Access
// =============================================================================

/// Follows a dotted path (`"customer.phone"`).
fn at_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, key| value.get(key))
}

/// First field in `fields` that holds a usable value.
///
/// `null` and blank strings count as missing.
pub fn first_value<'a>(doc: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields.iter().find_map(|field| {
        at_path(doc, field).filter(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    })
}

/// First text field. Numbers are accepted and printed (`1001` → `"1001"`).
pub fn first_str(doc: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match at_path(doc, field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First numeric field. Numeric strings (`"12.50"`, `"1,200"`) are accepted.
pub fn first_number(doc: &Value, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|field| {
        let n = match at_path(doc, field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }?;
        n.is_finite().then_some(n)
    })
}

fn number_or_zero(doc: &Value, fields: &[&str]) -> f64 {
    first_number(doc, fields).unwrap_or(0.0)
}

fn invalid(reason: impl Into<String>) -> CoreError {
    CoreError::InvalidDocument {
        reason: reason.into(),
    }
}

// =============================================================================
// Normalizers
// =============================================================================

/// Customer name and phone.
pub fn normalize_customer(doc: &Value) -> Customer {
    Customer {
        name: first_str(doc, CUSTOMER_NAME_FIELDS),
        phone: first_str(doc, CUSTOMER_PHONE_FIELDS),
    }
}

/// Whether the document is a sale or a return.
pub fn normalize_kind(doc: &Value) -> InvoiceKind {
    let declared = first_str(doc, KIND_FIELDS).map(|k| k.to_ascii_lowercase());
    match declared.as_deref() {
        Some("return") | Some("sales_return") | Some("salesreturn") => InvoiceKind::Return,
        Some(_) => InvoiceKind::Sale,
        None if first_value(doc, &["originalInvoiceNumber"]).is_some() => InvoiceKind::Return,
        None => InvoiceKind::Sale,
    }
}

/// One invoice line.
///
/// The item number is required. A missing name falls back to the item
/// number; missing numbers become 0. Derived amounts are recomputed, stored
/// ones are ignored.
pub fn normalize_line(doc: &Value) -> CoreResult<InvoiceLine> {
    if !doc.is_object() {
        return Err(invalid("line is not an object"));
    }

    let item_number =
        first_str(doc, ITEM_NUMBER_FIELDS).ok_or_else(|| invalid("line has no item number"))?;
    let item_name = first_str(doc, ITEM_NAME_FIELDS).unwrap_or_else(|| item_number.clone());

    let mut line = InvoiceLine::new(
        item_number,
        item_name,
        number_or_zero(doc, QUANTITY_FIELDS),
        first_str(doc, UNIT_FIELDS).unwrap_or_default(),
        number_or_zero(doc, UNIT_PRICE_FIELDS),
        number_or_zero(doc, DISCOUNT_PERCENT_FIELDS),
        number_or_zero(doc, TAX_PERCENT_FIELDS),
    );
    line.previous_returns = number_or_zero(doc, PREVIOUS_RETURNS_FIELDS);
    line.warehouse_id = first_str(doc, WAREHOUSE_FIELDS);
    Ok(line)
}

fn normalize_lines(doc: &Value) -> CoreResult<Vec<InvoiceLine>> {
    match first_value(doc, LINES_FIELDS) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(normalize_line).collect(),
        Some(_) => Err(invalid("items is not an array")),
    }
}

/// A sale document, as a draft ready for [`InvoiceDraft::into_invoice`].
///
/// Requires an invoice number and a parseable date.
pub fn normalize_invoice(doc: &Value) -> CoreResult<InvoiceDraft> {
    if !doc.is_object() {
        return Err(invalid("document is not an object"));
    }

    let invoice_number = first_str(doc, INVOICE_NUMBER_FIELDS)
        .ok_or_else(|| invalid("document has no invoice number"))?;

    let date = first_str(doc, DATE_FIELDS)
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| invalid(format!("invoice {invoice_number} has no readable date")))?;

    Ok(InvoiceDraft {
        invoice_number,
        date,
        branch_id: first_str(doc, BRANCH_FIELDS),
        warehouse_id: first_str(doc, WAREHOUSE_FIELDS),
        sales_rep: first_str(doc, SALES_REP_FIELDS),
        customer: normalize_customer(doc),
        payment_method: first_str(doc, PAYMENT_METHOD_FIELDS),
        lines: normalize_lines(doc)?,
    })
}

/// An existing sale document, keeping the quantities already returned.
///
/// Used when importing documents that have a return history. Each line's
/// `previous_returns` is kept, clamped to `[0, quantity]`.
pub fn normalize_stored_invoice(
    doc: &Value,
    id: String,
    now: DateTime<Utc>,
) -> CoreResult<Invoice> {
    let draft = normalize_invoice(doc)?;
    let returned: Vec<f64> = draft.lines.iter().map(|l| l.previous_returns).collect();

    let mut invoice = draft.into_invoice(id, now)?;
    for (line, prev) in invoice.lines.iter_mut().zip(returned) {
        line.previous_returns = prev.clamp(0.0, line.quantity);
    }
    Ok(invoice)
}

/// A reporting record for any stored document. Never fails.
///
/// Metrics that are absent stay `None` and count as 0 when summed. An
/// unreadable date leaves `date` empty, so the record is left out of the
/// monthly buckets.
pub fn normalize_sales_record(doc: &Value) -> SalesRecord {
    sales_record(doc, normalize_kind(doc))
}

/// Line-level reporting records for the items of a document.
///
/// Lines inherit the document's kind, number, date and grouping ids. Stored
/// line amounts are used when present, otherwise they are recomputed from
/// quantity, price and rates.
pub fn normalize_line_records(doc: &Value) -> Vec<SalesRecord> {
    let header = normalize_sales_record(doc);
    let Some(Value::Array(items)) = first_value(doc, LINES_FIELDS) else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| {
            let line = sales_record(item, header.kind);
            let computed = normalize_line(item).ok().map(|mut l| {
                l.quantity = line.quantity.unwrap_or(l.quantity).max(0.0);
                l.recompute();
                l
            });

            SalesRecord {
                item_number: line.item_number,
                item_name: line.item_name,
                quantity: line.quantity,
                total: line.total.or_else(|| computed.as_ref().map(|l| l.line_total)),
                discount: line.discount.or_else(|| computed.as_ref().map(|l| l.discount_value)),
                tax: line.tax.or_else(|| computed.as_ref().map(|l| l.tax_value)),
                net: line.net.or_else(|| computed.as_ref().map(InvoiceLine::net)),
                ..header.clone()
            }
        })
        .collect()
}

fn sales_record(doc: &Value, kind: InvoiceKind) -> SalesRecord {
    let (number_fields, quantity_fields) = match kind {
        InvoiceKind::Sale => (INVOICE_NUMBER_FIELDS, [QUANTITY_FIELDS, RETURNED_QTY_FIELDS]),
        InvoiceKind::Return => (REFERENCE_NUMBER_FIELDS, [RETURNED_QTY_FIELDS, QUANTITY_FIELDS]),
    };
    let money = |fields: &[&str]| first_number(doc, fields).map(Money::from_amount);

    SalesRecord {
        kind,
        document_number: first_str(doc, number_fields),
        date: first_str(doc, DATE_FIELDS).as_deref().and_then(parse_date),
        branch_id: first_str(doc, BRANCH_FIELDS),
        sales_rep: first_str(doc, SALES_REP_FIELDS),
        payment_method: first_str(doc, PAYMENT_METHOD_FIELDS),
        item_number: first_str(doc, ITEM_NUMBER_FIELDS),
        item_name: first_str(doc, ITEM_NAME_FIELDS),
        quantity: quantity_fields
            .iter()
            .find_map(|fields| first_number(doc, fields)),
        total: money(TOTAL_FIELDS),
        discount: money(DISCOUNT_VALUE_FIELDS),
        tax: money(TAX_VALUE_FIELDS),
        net: money(NET_FIELDS),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
