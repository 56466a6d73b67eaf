use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use vaptrack_core::{DomainError, DomainResult, UserId};

use crate::{AccessClaims, Role, claims::validate_claims};

/// Token issuing/validation contract.
///
/// Kept as a trait so the API layer can be exercised against a stub and the
/// signing scheme can change without touching handlers.
pub trait TokenService: Send + Sync {
    /// Mint a signed access token for `user_id` acting as `role`.
    fn issue(&self, user_id: UserId, role: Role, now: DateTime<Utc>) -> DomainResult<String>;

    /// Verify signature and time window, returning the embedded claims.
    ///
    /// Any failure collapses to `Unauthenticated`: callers must not be able
    /// to distinguish a forged token from an expired one.
    fn decode(&self, token: &str, now: DateTime<Utc>) -> DomainResult<AccessClaims>;
}

/// HMAC-SHA256 signed tokens with a fixed time-to-live.
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

impl TokenService for Hs256TokenService {
    fn issue(&self, user_id: UserId, role: Role, now: DateTime<Utc>) -> DomainResult<String> {
        let claims = AccessClaims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DomainError::store(format!("token encoding failed: {e}")))
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> DomainResult<AccessClaims> {
        // Time-window checks are done via validate_claims against the caller's
        // clock; jsonwebtoken only verifies the signature here.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                DomainError::Unauthenticated
            })?;

        validate_claims(&data.claims, now).map_err(|e| {
            tracing::debug!(error = %e, "claims rejected");
            DomainError::Unauthenticated
        })?;

        Ok(data.claims)
    }
}
