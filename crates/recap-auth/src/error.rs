//! Authentication error types.
//!
//! Every variant is caller-caused and maps to `401 Unauthorized`. The display
//! strings are part of the response body.

/// Errors raised while validating a signed request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// One of the required headers is absent, empty, or not valid UTF-8.
    #[error("missing authentication header")]
    MissingHeader {
        /// Name of the first header found missing.
        name: &'static str,
    },

    /// The `user_id` header is not a decimal integer that fits in 32 bits.
    #[error("invalid user_id")]
    InvalidUserId,

    /// The `timestamp` header is not an RFC 3339 date-time.
    #[error("invalid timestamp")]
    InvalidTimestamp,

    /// The timestamp is further from the server clock than the allowed skew.
    #[error("timestamp expired or too far in future")]
    ExpiredTimestamp,

    /// The supplied signature does not match the recomputed one.
    #[error("invalid signature")]
    InvalidSignature,
}

impl AuthError {
    /// Short machine-friendly name, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingHeader { .. } => "missing_header",
            Self::InvalidUserId => "invalid_user_id",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::ExpiredTimestamp => "expired_timestamp",
            Self::InvalidSignature => "invalid_signature",
        }
    }
}
