//! Error types for the store layer.

use thiserror::Error;
use uuid::Uuid;

/// Errors returned by an [`InvoiceStore`](crate::InvoiceStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database rejected a query or could not be reached.
    #[error("database error: {0}")]
    Database(String),

    /// Embedded migrations failed to apply.
    #[error("migration failed: {0}")]
    Migration(String),

    /// No row with the given id.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// A stored enum column holds a value no variant accepts.
    #[error("invalid {column} value in database: {value:?}")]
    InvalidColumn { column: &'static str, value: String },

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(feature = "postgres")]
pub(crate) fn map_db_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(e.to_string()),
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(e.to_string())
    }
}
