//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError         - Domain rule violations                        │
//! │  ├── ValidationError   - Input validation failures                     │
//! │  └── ReturnRejection   - Return batch refused (returns.rs)             │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError           - Store failures, wraps CoreError               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → toast in the UI         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (invoice number, field, index)
//! 3. Errors are enum variants, never String
//! 4. Each variant maps to a user-facing message

use thiserror::Error;

use crate::returns::ReturnRejection;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A line index does not exist on the invoice.
    ///
    /// ## When This Occurs
    /// - The UI edits or deletes a line that another session already removed
    /// - A return plan is applied to a different revision of the invoice
    #[error("Invoice {invoice_number} has no line at position {index}")]
    LineNotFound { invoice_number: String, index: usize },

    /// An edited line would sell less than has already been returned.
    #[error("Quantity {quantity} of {item_number} is below the {returned} already returned")]
    QuantityBelowReturned {
        item_number: String,
        quantity: f64,
        returned: f64,
    },

    /// A line with recorded returns cannot be switched to another item.
    ///
    /// The return documents reference the line by position and item.
    #[error("{item_number} has {returned} returned and cannot be changed to {replacement}")]
    ItemChangeAfterReturns {
        item_number: String,
        replacement: String,
        returned: f64,
    },

    /// A line that already has returns recorded against it cannot be deleted.
    #[error("{item_number} has {returned} returned and cannot be removed")]
    LineHasReturns { item_number: String, returned: f64 },

    /// The invoice already holds the maximum number of lines.
    #[error("Invoice cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// An operation targeted a different invoice than the one supplied.
    #[error("Expected invoice {expected}, got {actual}")]
    InvoiceMismatch { expected: String, actual: String },

    /// A loosely-shaped document could not be turned into a record.
    #[error("Invalid document: {reason}")]
    InvalidDocument { reason: String },

    /// A return batch failed reconciliation.
    #[error(transparent)]
    ReturnRejected(#[from] ReturnRejection),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Reported synchronously to the user; the save is aborted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate invoice number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::LineNotFound {
            invoice_number: "INV-1001".to_string(),
            index: 4,
        };
        assert_eq!(err.to_string(), "Invoice INV-1001 has no line at position 4");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "itemNumber".to_string(),
        };
        assert_eq!(err.to_string(), "itemNumber is required");

        let err = ValidationError::OutOfRange {
            field: "discountPercent".to_string(),
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(err.to_string(), "discountPercent must be between 0 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "invoiceNumber".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
