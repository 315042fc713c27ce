//! # Validation Module
//!
//! Input validation for invoice headers, lines and return requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser form                                                 │
//! │  ├── Required inputs, numeric keyboards                                │
//! │  └── Immediate feedback                                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: tally-core (THIS MODULE)                                     │
//! │  ├── Required fields, lengths, finite non-negative numbers             │
//! │  └── Runs before any store write; failure aborts the save              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL constraints                                              │
//! │  └── UNIQUE invoice / reference numbers                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Validation vs Clamping
//! [`crate::calc::compute_line`] clamps out-of-range numbers so it is total.
//! The checks here are what stop such numbers from being saved.

use crate::error::ValidationError;
use crate::types::InvoiceLine;
use crate::{MAX_DISCOUNT_PERCENT, MAX_LINE_AMOUNT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted invoice / reference / item number.
const MAX_NUMBER_LEN: usize = 50;

/// Longest accepted item name.
const MAX_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

fn validate_code(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NUMBER_LEN,
        });
    }

    if value.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a human-assigned invoice number.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_invoice_number;
///
/// assert!(validate_invoice_number("INV-2024-0001").is_ok());
/// assert!(validate_invoice_number("").is_err());
/// ```
pub fn validate_invoice_number(number: &str) -> ValidationResult<()> {
    validate_code("invoiceNumber", number)
}

/// Validates a return reference number.
pub fn validate_reference_number(number: &str) -> ValidationResult<()> {
    validate_code("referenceNumber", number)
}

/// Validates an item number (code / SKU).
pub fn validate_item_number(number: &str) -> ValidationResult<()> {
    validate_code("itemNumber", number)
}

fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an item name.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    validate_name("itemName", name)
}

/// Validates the display name of a branch, warehouse, payment method or
/// sales rep. Ids use [`validate_reference_id`].
pub fn validate_reference_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)
}

/// Validates a reference list id.
pub fn validate_reference_id(id: &str) -> ValidationResult<()> {
    validate_code("id", id)
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn validate_non_negative(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a line quantity. Zero is allowed (placeholder lines).
pub fn validate_quantity(qty: f64) -> ValidationResult<()> {
    validate_non_negative("quantity", qty)
}

/// Validates a unit price. Zero is allowed (free items).
pub fn validate_unit_price(price: f64) -> ValidationResult<()> {
    validate_non_negative("unitPrice", price)
}

/// Validates a discount percentage (0-100).
pub fn validate_discount_percent(pct: f64) -> ValidationResult<()> {
    validate_non_negative("discountPercent", pct)?;

    if pct > MAX_DISCOUNT_PERCENT {
        return Err(ValidationError::OutOfRange {
            field: "discountPercent".to_string(),
            min: 0.0,
            max: MAX_DISCOUNT_PERCENT,
        });
    }

    Ok(())
}

/// Validates a tax percentage (>= 0).
pub fn validate_tax_percent(pct: f64) -> ValidationResult<()> {
    validate_non_negative("taxPercent", pct)
}

/// Validates a requested return quantity.
pub fn validate_return_quantity(qty: f64) -> ValidationResult<()> {
    validate_non_negative("returnedQty", qty)
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every input field of an invoice line.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Invoice page: "Add line"                                               │
/// │                                                                         │
/// │  validate_line(&line) ← THIS FUNCTION                                   │
/// │       │                                                                 │
/// │       ├── missing item number / name? → "itemNumber is required"        │
/// │       ├── negative or NaN number?     → "quantity must not be negative" │
/// │       ├── discount over 100%?         → "discountPercent must be ..."   │
/// │       ├── qty × price over the cap?   → "lineTotal must be ..."         │
/// │       │                                                                 │
/// │       └── OK → line appended, items[] rewritten                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_line(line: &InvoiceLine) -> ValidationResult<()> {
    validate_item_number(&line.item_number)?;
    validate_item_name(&line.item_name)?;
    validate_quantity(line.quantity)?;
    validate_unit_price(line.unit_price)?;
    validate_discount_percent(line.discount_percent)?;
    validate_tax_percent(line.tax_percent)?;

    if line.quantity * line.unit_price > MAX_LINE_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: "lineTotal".to_string(),
            min: 0.0,
            max: MAX_LINE_AMOUNT,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_invoice_number() {
        assert!(validate_invoice_number("INV-2024-0001").is_ok());
        assert!(validate_invoice_number("فاتورة-12").is_ok());

        assert!(validate_invoice_number("").is_err());
        assert!(validate_invoice_number("   ").is_err());
        assert!(validate_invoice_number("INV\n1").is_err());
        assert!(validate_invoice_number(&"9".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_item_name() {
        assert!(validate_item_name("Basmati rice 5kg").is_ok());
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_numeric_validators() {
        assert!(validate_quantity(0.0).is_ok());
        assert!(validate_quantity(2.5).is_ok());
        assert!(validate_quantity(-1.0).is_err());
        assert!(validate_quantity(f64::NAN).is_err());

        assert!(validate_unit_price(0.0).is_ok());
        assert!(validate_unit_price(f64::INFINITY).is_err());

        assert!(validate_discount_percent(100.0).is_ok());
        assert!(validate_discount_percent(100.5).is_err());
        assert!(validate_discount_percent(-1.0).is_err());

        assert!(validate_tax_percent(15.0).is_ok());
        assert!(validate_tax_percent(-0.5).is_err());
    }

    #[test]
    fn test_validate_line() {
        let line = InvoiceLine::new("A-1", "Rice", 2.0, "bag", 100.0, 10.0, 15.0);
        assert!(validate_line(&line).is_ok());

        let mut missing = line.clone();
        missing.item_name = String::new();
        assert_eq!(
            validate_line(&missing),
            Err(ValidationError::Required {
                field: "itemName".to_string()
            })
        );

        let mut over = line.clone();
        over.discount_percent = 120.0;
        assert!(matches!(
            validate_line(&over),
            Err(ValidationError::OutOfRange { .. })
        ));

        let mut huge = line;
        huge.quantity = 1.0;
        huge.unit_price = 1e17;
        assert_eq!(
            validate_line(&huge),
            Err(ValidationError::OutOfRange {
                field: "lineTotal".to_string(),
                min: 0.0,
                max: MAX_LINE_AMOUNT,
            })
        );
    }

    #[test]
    fn test_validate_return_quantity() {
        assert!(validate_return_quantity(0.0).is_ok());
        assert!(validate_return_quantity(1.5).is_ok());
        assert!(validate_return_quantity(-1.0).is_err());
        assert!(validate_return_quantity(f64::NAN).is_err());
    }
}
