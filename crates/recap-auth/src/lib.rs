//! # recap-auth
//!
//! Request authentication for the recap service.
//!
//! Callers prove who they are with three headers:
//!
//! - `timestamp` - an RFC 3339 date-time with offset
//! - `user_id` - the decimal user identifier (fits `u32`)
//! - `sign` - `base64(timestamp + secret + user_id)`, or
//!   `base64(timestamp + user_id)` when no secret is configured
//!
//! The timestamp must be within ten minutes of the server clock.
//!
//! ## Security
//!
//! The signature is a reversible encoding, not a keyed digest, and it is
//! compared with ordinary string equality. Anyone who observes one signed
//! request can recover the secret. The scheme is kept as-is because existing
//! callers produce exactly this value.
//!
//! ## Modules
//!
//! - [`credential`] - Header extraction and parsing
//! - [`validator`] - Skew and signature checks
//! - [`error`] - Authentication error types

pub mod credential;
pub mod error;
pub mod validator;

pub use credential::{RequestCredential, SIGN_HEADER, TIMESTAMP_HEADER, USER_ID_HEADER};
pub use error::AuthError;
pub use validator::{MAX_CLOCK_SKEW, SignatureValidator, compute_signature};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;
