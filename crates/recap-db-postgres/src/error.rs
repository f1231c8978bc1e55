//! Error types for the PostgreSQL recap store.

use recap_storage::StoreError;
use sqlx_core::error::Error as SqlxError;

/// Errors raised while setting up the PostgreSQL backend.
///
/// Request-path failures are reported as [`StoreError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Result type alias for PostgreSQL setup operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

/// Classifies a sqlx error raised on the request path.
///
/// Waiting too long for a pooled connection counts as a timeout, so callers
/// can tell an overloaded database from a broken one.
pub(crate) fn classify(err: SqlxError) -> StoreError {
    match err {
        SqlxError::PoolTimedOut => StoreError::Timeout,
        SqlxError::PoolClosed | SqlxError::Io(_) | SqlxError::Tls(_) => {
            StoreError::connection(err.to_string())
        }
        SqlxError::ColumnDecode { .. }
        | SqlxError::ColumnNotFound(_)
        | SqlxError::Decode(_)
        | SqlxError::TypeNotFound { .. } => StoreError::decode(err.to_string()),
        other => StoreError::query(other.to_string()),
    }
}
