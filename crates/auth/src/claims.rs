use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vaptrack_core::UserId;

use crate::Role;

/// Access-token claims model (transport-agnostic).
///
/// `iat`/`exp` are Unix timestamps in seconds, as JWTs carry them on the
/// wire. The signing/verification layer lives in [`crate::token`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the authenticated user.
    pub sub: UserId,

    /// Role granted to the subject (single-role system).
    pub role: Role,

    /// Issued-at timestamp (Unix seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix seconds).
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate token claims.
///
/// Note: this validates the *claims* only. Signature verification is done by
/// the token service before the claims ever reach this function.
pub fn validate_claims(claims: &AccessClaims, now: DateTime<Utc>) -> Result<(), ClaimsValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(ClaimsValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(ClaimsValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(ClaimsValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn claims(iat: i64, exp: i64) -> AccessClaims {
        AccessClaims {
            sub: UserId::new(1),
            role: Role::Tester,
            iat,
            exp,
        }
    }

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    #[test]
    fn accepts_claims_inside_window() {
        assert!(validate_claims(&claims(100, 200), at(150)).is_ok());
    }

    #[test]
    fn rejects_expired_claims() {
        assert_eq!(
            validate_claims(&claims(100, 200), at(200)),
            Err(ClaimsValidationError::Expired)
        );
    }

    #[test]
    fn rejects_future_issued_at() {
        assert_eq!(
            validate_claims(&claims(100, 200), at(50)),
            Err(ClaimsValidationError::NotYetValid)
        );
    }

    #[test]
    fn rejects_inverted_window() {
        assert_eq!(
            validate_claims(&claims(200, 100), at(150)),
            Err(ClaimsValidationError::InvalidTimeWindow)
        );
    }
}
