//! Session token type.
//!
//! The storefront issues JWT bearer tokens. The client never holds the signing
//! secret, so it only *decodes* the payload to read the expiry claim. The
//! server remains the authority on validity; a decoded claim is a hint used to
//! drop stale sessions early.

use core::fmt;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Base64url engine that accepts payload segments with or without padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors that can occur when reading a [`SessionToken`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token string is empty or only whitespace.
    #[error("token cannot be empty")]
    Empty,
    /// The token does not have the `header.payload.signature` shape.
    #[error("token must have three dot-separated segments")]
    Malformed,
    /// The payload segment is not valid base64url.
    #[error("token payload is not valid base64: {0}")]
    Encoding(String),
    /// The payload is not a JSON object.
    #[error("token payload is not a JSON object: {0}")]
    Payload(String),
    /// The payload has no numeric `exp` claim.
    #[error("token has no numeric exp claim")]
    MissingExpiry,
}

/// Claims read from a token payload.
///
/// Only `exp` is required. The remaining claims are informational and are
/// kept loosely typed since the client never acts on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Subject (user id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// User role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Issued-at, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl TokenClaims {
    /// Expiry as a UTC timestamp, if it is representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Returns `true` once `now` has reached the expiry second.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// An opaque bearer token.
///
/// The raw value is held as a secret and redacted from `Debug` output.
///
/// ## Examples
///
/// ```
/// use secondhand_core::SessionToken;
///
/// assert!(SessionToken::new("abc123").is_ok());
/// assert!(SessionToken::new("   ").is_err());
///
/// let token = SessionToken::new("abc123").unwrap();
/// assert!(!format!("{token:?}").contains("abc123"));
/// ```
#[derive(Clone)]
pub struct SessionToken(SecretString);

impl SessionToken {
    /// Wrap a raw token string.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Empty`] if the input is empty or whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, TokenError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(Self(SecretString::from(raw)))
    }

    /// Returns the raw token for building an `Authorization` header or
    /// writing it to storage.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Decode the payload claims without verifying the signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a three-segment JWT, the payload
    /// is not base64url-encoded JSON, or the `exp` claim is absent or not a
    /// number.
    pub fn claims(&self) -> Result<TokenClaims, TokenError> {
        let mut segments = self.expose().split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };
        if payload.is_empty() {
            return Err(TokenError::Malformed);
        }

        // Tolerate the standard alphabet as well as base64url.
        let normalized = payload.replace('+', "-").replace('/', "_");
        let bytes = PAYLOAD_ENGINE
            .decode(normalized)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| TokenError::Payload(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| TokenError::Payload("expected an object".to_string()))?;

        let exp = object
            .get("exp")
            .and_then(numeric_date)
            .ok_or(TokenError::MissingExpiry)?;

        Ok(TokenClaims {
            exp,
            sub: object
                .get("sub")
                .and_then(serde_json::Value::as_str)
                .map(String::from),
            role: object
                .get("role")
                .and_then(serde_json::Value::as_str)
                .map(String::from),
            iat: object.get("iat").and_then(numeric_date),
        })
    }
}

/// Read a JWT `NumericDate`, which may carry a fractional part.
#[allow(clippy::cast_possible_truncation)] // Seconds since epoch fit in i64
fn numeric_date(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

impl PartialEq for SessionToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for SessionToken {}

impl std::str::FromStr for SessionToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

    use super::*;

    fn jwt_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn test_new_rejects_blank() {
        assert_eq!(SessionToken::new("").unwrap_err(), TokenError::Empty);
        assert_eq!(SessionToken::new(" \t").unwrap_err(), TokenError::Empty);
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = SessionToken::new("very-secret-token").unwrap();
        let debug = format!("{token:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("very-secret-token"));
    }

    #[test]
    fn test_claims_decoded() {
        let raw = jwt_with_payload(&serde_json::json!({
            "sub": "7f0c1a52-2f0e-4a57-9a43-0cfe4a1b2c3d",
            "role": "Customer",
            "exp": 1_900_000_000_i64,
            "iat": 1_899_990_000_i64,
        }));
        let claims = SessionToken::new(raw).unwrap().claims().unwrap();
        assert_eq!(claims.exp, 1_900_000_000);
        assert_eq!(claims.iat, Some(1_899_990_000));
        assert_eq!(claims.role.as_deref(), Some("Customer"));
        assert_eq!(
            claims.sub.as_deref(),
            Some("7f0c1a52-2f0e-4a57-9a43-0cfe4a1b2c3d")
        );
    }

    #[test]
    fn test_claims_accept_padded_standard_alphabet() {
        let body = STANDARD.encode(r#"{"exp":1700000000,"sub":"??>?"}"#);
        assert!(body.contains('/') && body.ends_with("=="));
        let raw = format!("e30.{body}.sig");
        let claims = SessionToken::new(raw).unwrap().claims().unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
    }

    #[test]
    fn test_claims_fractional_exp() {
        let raw = jwt_with_payload(&serde_json::json!({ "exp": 1_700_000_000.75 }));
        let claims = SessionToken::new(raw).unwrap().claims().unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
    }

    #[test]
    fn test_claims_malformed_shapes() {
        for raw in ["abc123", "a.b", "a.b.c.d", "a..c"] {
            let token = SessionToken::new(raw).unwrap();
            assert_eq!(token.claims().unwrap_err(), TokenError::Malformed, "{raw}");
        }
    }

    #[test]
    fn test_claims_bad_encoding() {
        let token = SessionToken::new("a.!!!.c").unwrap();
        assert!(matches!(token.claims(), Err(TokenError::Encoding(_))));
    }

    #[test]
    fn test_claims_payload_not_object() {
        let body = URL_SAFE_NO_PAD.encode("[1,2,3]");
        let token = SessionToken::new(format!("h.{body}.s")).unwrap();
        assert!(matches!(token.claims(), Err(TokenError::Payload(_))));

        let body = URL_SAFE_NO_PAD.encode("not json");
        let token = SessionToken::new(format!("h.{body}.s")).unwrap();
        assert!(matches!(token.claims(), Err(TokenError::Payload(_))));
    }

    #[test]
    fn test_claims_missing_or_textual_exp() {
        let raw = jwt_with_payload(&serde_json::json!({ "sub": "x" }));
        let token = SessionToken::new(raw).unwrap();
        assert_eq!(token.claims().unwrap_err(), TokenError::MissingExpiry);

        let raw = jwt_with_payload(&serde_json::json!({ "exp": "1700000000" }));
        let token = SessionToken::new(raw).unwrap();
        assert_eq!(token.claims().unwrap_err(), TokenError::MissingExpiry);
    }

    #[test]
    fn test_is_expired_at() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let claims = |exp| TokenClaims {
            exp,
            sub: None,
            role: None,
            iat: None,
        };
        assert!(claims(1_699_999_990).is_expired_at(now));
        assert!(claims(1_700_000_000).is_expired_at(now));
        assert!(!claims(1_700_000_001).is_expired_at(now));
    }

    #[test]
    fn test_expires_at() {
        let claims = TokenClaims {
            exp: 1_700_000_000,
            sub: None,
            role: None,
            iat: None,
        };
        assert_eq!(
            claims.expires_at().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }
}
