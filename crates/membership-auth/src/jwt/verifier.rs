//! Token verification against a set of keys.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use membership_core::error::AppError;
use membership_entity::session::SigningKey;

use super::claims::SessionClaims;

/// Verifies session tokens against every currently valid key.
///
/// Expiry is checked against the caller's clock rather than the system
/// time.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    validation: Validation,
}

impl Default for TokenVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenVerifier {
    /// Creates a verifier for HS256 tokens.
    pub fn new() -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self { validation }
    }

    /// Try `keys` in order (newest first) and return the claims of the
    /// first key whose signature matches.
    pub fn verify(
        &self,
        token: &str,
        keys: &[SigningKey],
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, AppError> {
        for key in keys {
            match decode::<SessionClaims>(
                token,
                &DecodingKey::from_secret(&key.material),
                &self.validation,
            ) {
                Ok(data) => {
                    if data.claims.is_expired_at(now) {
                        return Err(AppError::authentication("Session has expired"));
                    }
                    return Ok(data.claims);
                }
                Err(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::InvalidSignature) => {
                    continue;
                }
                Err(e) => {
                    return Err(AppError::authentication(format!("Invalid session token: {e}")));
                }
            }
        }
        Err(AppError::authentication("Invalid session signature"))
    }
}
