//! Session token inspection.
//!
//! Decodes the payload of a JWT without verifying its signature, the same
//! way the reconciler does on page load.

use chrono::{DateTime, Utc};
use secondhand_core::{SessionToken, TokenClaims, TokenError};
use serde::Serialize;

/// Inspection result printed as JSON.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TokenReport {
    pub verdict: Verdict,
    pub subject: Option<String>,
    pub role: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Seconds until expiry; negative once expired.
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Valid,
    Expired,
}

/// Build the report for `raw` at `now`.
///
/// # Errors
///
/// Returns the decode error for tokens the reconciler would treat as
/// malformed.
pub fn report(raw: &str, now: DateTime<Utc>) -> Result<TokenReport, TokenError> {
    let claims: TokenClaims = SessionToken::new(raw.trim())?.claims()?;
    let verdict = if claims.is_expired_at(now) {
        Verdict::Expired
    } else {
        Verdict::Valid
    };
    Ok(TokenReport {
        verdict,
        expires_at: claims.expires_at(),
        issued_at: claims
            .iat
            .and_then(|iat| DateTime::from_timestamp(iat, 0)),
        expires_in: claims.exp - now.timestamp(),
        subject: claims.sub,
        role: claims.role,
    })
}

/// Print the report for `raw` to stdout.
///
/// # Errors
///
/// Returns an error if the token is malformed or the report cannot be
/// encoded.
pub fn inspect(raw: &str, now: DateTime<Utc>) -> Result<(), Box<dyn std::error::Error>> {
    let report = report(raw, now)?;
    if report.verdict == Verdict::Expired {
        tracing::warn!(expires_at = ?report.expires_at, "Token has expired");
    }

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
