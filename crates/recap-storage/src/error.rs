//! Error types for persistent store lookups.

/// Errors that can occur while reading from the persistent store.
///
/// A missing row is not an error; lookups return `Ok(None)` for it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The query did not complete before its deadline.
    #[error("Query timed out")]
    Timeout,

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The backend rejected or failed the query.
    #[error("Query error: {message}")]
    Query {
        /// Description of the query failure.
        message: String,
    },

    /// A row was returned but could not be decoded into a record.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Query` error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns `true` if the error is a deadline expiry.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
