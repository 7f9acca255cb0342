//! Token signing with a given key.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

use membership_core::error::AppError;
use membership_entity::session::SigningKey;

use super::claims::SessionClaims;

/// Signs session claims with HMAC-SHA256.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSigner;

impl TokenSigner {
    /// Sign `claims` with `key`. The key id travels in the header.
    pub fn sign(&self, claims: &SessionClaims, key: &SigningKey) -> Result<String, AppError> {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(key.id.to_string());

        encode(&header, claims, &EncodingKey::from_secret(&key.material))
            .map_err(|e| AppError::internal(format!("Failed to encode session token: {e}")))
    }
}
