//! # Database Error Types
//!
//! Error types for document store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)      Domain Error (tally_core::CoreError)  │
//! │       │                                 │                               │
//! │       └───────────────┬─────────────────┘                               │
//! │                       ▼                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  user_message()                                                        │
//! │  ├── validation / rejected return → the specific reason                │
//! │  └── persistence failure          → generic "could not be saved"       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_core::returns::ReturnRejection;
use tally_core::CoreError;
use thiserror::Error;

/// Document store errors.
///
/// These errors wrap sqlx and domain errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in the store.
    ///
    /// ## When This Occurs
    /// - Unknown invoice number on a return
    /// - Line edit against a deleted invoice
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate invoice number
    /// - Duplicate return reference number
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The document changed since it was read.
    ///
    /// ## When This Occurs
    /// - Two returns submitted against the same invoice at once
    /// - A line edit racing a return
    ///
    /// Nothing was written. The caller may reload and resubmit.
    #[error("{entity} {id} was modified concurrently (expected version {expected_version})")]
    Conflict {
        entity: String,
        id: String,
        expected_version: i64,
    },

    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Stored JSON could not be read or written.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>, expected_version: i64) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
            expected_version,
        }
    }

    /// Whether the user caused this and can fix it by changing the input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DbError::Domain(_)
                | DbError::UniqueViolation { .. }
                | DbError::NotFound { .. }
                | DbError::Conflict { .. }
        )
    }

    /// Message to show the user.
    ///
    /// Persistence failures are not distinguished; the detail goes to the log.
    pub fn user_message(&self) -> String {
        if self.is_user_error() {
            self.to_string()
        } else {
            "The document could not be saved. Please try again.".to_string()
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ReturnRejection> for DbError {
    fn from(err: ReturnRejection) -> Self {
        DbError::Domain(CoreError::ReturnRejected(err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ValidationError;

    #[test]
    fn test_user_message_hides_persistence_detail() {
        let err = DbError::QueryFailed("disk I/O error".to_string());
        assert!(!err.is_user_error());
        assert!(!err.user_message().contains("disk"));

        let err = DbError::duplicate("invoice_number", "INV-1");
        assert_eq!(err.user_message(), "Duplicate invoice_number: 'INV-1' already exists");
    }

    #[test]
    fn test_domain_errors_pass_through() {
        let err: DbError = CoreError::from(ValidationError::Required {
            field: "itemNumber".to_string(),
        })
        .into();
        assert!(err.is_user_error());
        assert_eq!(err.user_message(), "Validation error: itemNumber is required");

        let err: DbError = ReturnRejection::EmptyRequest.into();
        assert_eq!(err.to_string(), "Return has no lines to return");
    }
}
