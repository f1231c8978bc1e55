//! Extraction of the signed identity claim from request headers.

use axum::http::HeaderMap;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::AuthResult;
use crate::error::AuthError;

pub const TIMESTAMP_HEADER: &str = "timestamp";
pub const USER_ID_HEADER: &str = "user_id";
pub const SIGN_HEADER: &str = "sign";

/// A syntactically valid identity claim.
///
/// Constructing one only proves the headers are well-formed; the skew and
/// signature checks live in [`SignatureValidator`](crate::SignatureValidator).
/// The raw header strings are kept because the signature is computed over
/// them, not over the parsed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCredential {
    pub timestamp: OffsetDateTime,
    pub timestamp_raw: String,
    pub user_id: u32,
    pub user_id_raw: String,
    pub signature: String,
}

impl RequestCredential {
    /// Reads and parses the three authentication headers.
    ///
    /// Header names are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// - `MissingHeader` if any header is absent or empty
    /// - `InvalidUserId` if `user_id` is not a `u32` in decimal
    /// - `InvalidTimestamp` if `timestamp` is not RFC 3339
    pub fn from_headers(headers: &HeaderMap) -> AuthResult<Self> {
        let timestamp_raw = header_value(headers, TIMESTAMP_HEADER)?;
        let user_id_raw = header_value(headers, USER_ID_HEADER)?;
        let signature = header_value(headers, SIGN_HEADER)?;

        let user_id = parse_user_id(user_id_raw)?;
        let timestamp = OffsetDateTime::parse(timestamp_raw, &Rfc3339)
            .map_err(|_| AuthError::InvalidTimestamp)?;

        Ok(Self {
            timestamp,
            timestamp_raw: timestamp_raw.to_string(),
            user_id,
            user_id_raw: user_id_raw.to_string(),
            signature: signature.to_string(),
        })
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &'static str) -> AuthResult<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingHeader { name })
}

// Plain ASCII digits only: no sign, no whitespace.
fn parse_user_id(raw: &str) -> AuthResult<u32> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthError::InvalidUserId);
    }
    raw.parse::<u32>().map_err(|_| AuthError::InvalidUserId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_parses_valid_headers() {
        let cred = RequestCredential::from_headers(&headers(&[
            ("timestamp", "2024-01-01T00:00:00Z"),
            ("user_id", "42"),
            ("sign", "abc"),
        ]))
        .unwrap();

        assert_eq!(cred.user_id, 42);
        assert_eq!(cred.user_id_raw, "42");
        assert_eq!(cred.timestamp_raw, "2024-01-01T00:00:00Z");
        assert_eq!(cred.timestamp.unix_timestamp(), 1_704_067_200);
        assert_eq!(cred.signature, "abc");
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let mut map = HeaderMap::new();
        for (name, value) in [
            ("Timestamp", "2024-01-01T00:00:00+07:00"),
            ("USER_ID", "7"),
            ("Sign", "x"),
        ] {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static(value),
            );
        }

        let cred = RequestCredential::from_headers(&map).unwrap();
        assert_eq!(cred.user_id, 7);
    }

    #[test]
    fn test_missing_or_empty_header() {
        let err = RequestCredential::from_headers(&headers(&[
            ("timestamp", "2024-01-01T00:00:00Z"),
            ("user_id", "42"),
        ]))
        .unwrap_err();
        assert_eq!(err, AuthError::MissingHeader { name: "sign" });

        let err = RequestCredential::from_headers(&headers(&[
            ("timestamp", ""),
            ("user_id", "42"),
            ("sign", "abc"),
        ]))
        .unwrap_err();
        assert_eq!(err, AuthError::MissingHeader { name: "timestamp" });
    }

    #[test]
    fn test_invalid_user_id() {
        for raw in ["-1", "+42", "abc", "4294967296", " 42", "4.2"] {
            let err = RequestCredential::from_headers(&headers(&[
                ("timestamp", "2024-01-01T00:00:00Z"),
                ("user_id", raw),
                ("sign", "abc"),
            ]))
            .unwrap_err();
            assert_eq!(err, AuthError::InvalidUserId, "user_id {raw:?}");
        }
    }

    #[test]
    fn test_user_id_upper_bound() {
        let cred = RequestCredential::from_headers(&headers(&[
            ("timestamp", "2024-01-01T00:00:00Z"),
            ("user_id", "4294967295"),
            ("sign", "abc"),
        ]))
        .unwrap();
        assert_eq!(cred.user_id, u32::MAX);
    }

    #[test]
    fn test_user_id_checked_before_timestamp() {
        let err = RequestCredential::from_headers(&headers(&[
            ("timestamp", "yesterday"),
            ("user_id", "nope"),
            ("sign", "abc"),
        ]))
        .unwrap_err();
        assert_eq!(err, AuthError::InvalidUserId);
    }

    #[test]
    fn test_invalid_timestamp() {
        for raw in ["2024-01-01", "1704067200", "2024-01-01T00:00:00", "not a date"] {
            let err = RequestCredential::from_headers(&headers(&[
                ("timestamp", raw),
                ("user_id", "42"),
                ("sign", "abc"),
            ]))
            .unwrap_err();
            assert_eq!(err, AuthError::InvalidTimestamp, "timestamp {raw:?}");
        }
    }
}
