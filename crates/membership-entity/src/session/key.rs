//! Signing key entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use membership_core::result::AppResult;
use membership_core::types::SqlRow;

/// Key material used to sign session tokens.
///
/// Several keys may be valid at once: the newest signs and every valid one
/// verifies.
#[derive(Clone, Serialize, Deserialize)]
pub struct SigningKey {
    /// Row identifier.
    pub id: i64,
    /// Raw key bytes.
    #[serde(skip_serializing)]
    pub material: Vec<u8>,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window, exclusive.
    pub valid_until: DateTime<Utc>,
}

impl SigningKey {
    /// Decode a `signing_keys` row. `material` holds the base64-decoded key.
    pub fn from_row(row: &SqlRow, material: Vec<u8>) -> AppResult<Self> {
        Ok(Self {
            id: row.i64("id")?,
            material,
            valid_from: row.timestamp("valid_from")?,
            valid_until: row.timestamp("valid_until")?,
        })
    }

    /// Whether the key is usable at `at`.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at < self.valid_until
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("id", &self.id)
            .field("material", &"<redacted>")
            .field("valid_from", &self.valid_from)
            .field("valid_until", &self.valid_until)
            .finish()
    }
}
