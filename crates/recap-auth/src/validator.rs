//! Skew and signature validation.

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::credential::RequestCredential;
use crate::error::AuthError;

/// Maximum distance between the claimed timestamp and the server clock.
pub const MAX_CLOCK_SKEW: Duration = Duration::minutes(10);

/// Computes the signature callers are expected to send.
///
/// `base64(timestamp + secret + user_id)`; the secret is left out of the
/// payload when it is `None` or empty.
#[must_use]
pub fn compute_signature(timestamp: &str, user_id: &str, secret: Option<&str>) -> String {
    let payload = match secret {
        Some(secret) if !secret.is_empty() => format!("{timestamp}{secret}{user_id}"),
        _ => format!("{timestamp}{user_id}"),
    };
    STANDARD.encode(payload)
}

/// Validates signed requests against a shared secret.
///
/// Validation is a pure function of the headers, the secret and the current
/// time. It never performs I/O.
#[derive(Clone, Default)]
pub struct SignatureValidator {
    secret: Option<String>,
}

impl SignatureValidator {
    /// Creates a validator. An empty secret behaves like no secret.
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Returns `true` if a shared secret is configured.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Validates request headers against the current time and returns the
    /// authenticated user id.
    pub fn validate(&self, headers: &HeaderMap) -> AuthResult<u32> {
        self.validate_at(headers, OffsetDateTime::now_utc())
    }

    /// Validates request headers as of `now`.
    pub fn validate_at(&self, headers: &HeaderMap, now: OffsetDateTime) -> AuthResult<u32> {
        let credential = RequestCredential::from_headers(headers)?;
        self.verify(&credential, now)?;
        Ok(credential.user_id)
    }

    /// Checks the skew window, then the signature.
    ///
    /// A stale timestamp is reported as `ExpiredTimestamp` whether or not the
    /// signature matches.
    pub fn verify(&self, credential: &RequestCredential, now: OffsetDateTime) -> AuthResult<()> {
        if (now - credential.timestamp).abs() > MAX_CLOCK_SKEW {
            return Err(AuthError::ExpiredTimestamp);
        }

        let expected = compute_signature(
            &credential.timestamp_raw,
            &credential.user_id_raw,
            self.secret.as_deref(),
        );
        // Plain equality, not constant-time. Kept for wire compatibility.
        if expected != credential.signature {
            return Err(AuthError::InvalidSignature);
        }
        Ok(())
    }
}

impl std::fmt::Debug for SignatureValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidator")
            .field("secret", &self.secret.as_ref().map(|_| "****"))
            .finish()
    }
}
