//! Signing key repository. Key material is stored base64-encoded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};

use membership_core::error::{AppError, ErrorKind};
use membership_core::result::AppResult;
use membership_core::traits::SqlExecutor;
use membership_core::types::{SqlRow, SqlValue};
use membership_entity::session::SigningKey;

/// Repository for session signing keys.
#[derive(Debug, Clone, Copy)]
pub struct SigningKeyRepository;

impl SigningKeyRepository {
    /// Keys valid at `at`, newest first.
    pub async fn find_valid<E>(db: &mut E, at: DateTime<Utc>) -> AppResult<Vec<SigningKey>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_all(
            "SELECT id, key_material, valid_from, valid_until FROM signing_keys \
             WHERE valid_from <= ? AND valid_until > ? ORDER BY valid_from DESC, id DESC",
            &[SqlValue::Timestamp(at), SqlValue::Timestamp(at)],
        )
        .await?
        .iter()
        .map(decode_key)
        .collect()
    }

    /// Every stored key, newest first.
    pub async fn find_all<E>(db: &mut E) -> AppResult<Vec<SigningKey>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_all(
            "SELECT id, key_material, valid_from, valid_until FROM signing_keys \
             ORDER BY valid_from DESC, id DESC",
            &[],
        )
        .await?
        .iter()
        .map(decode_key)
        .collect()
    }

    /// Persist a key and return its id.
    pub async fn insert<E>(
        db: &mut E,
        material: &[u8],
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> AppResult<i64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_one(
            "INSERT INTO signing_keys (key_material, valid_from, valid_until) \
             VALUES (?, ?, ?) RETURNING id",
            &[
                SqlValue::Text(STANDARD.encode(material)),
                SqlValue::Timestamp(valid_from),
                SqlValue::Timestamp(valid_until),
            ],
        )
        .await?
        .i64("id")
    }
}

fn decode_key(row: &SqlRow) -> AppResult<SigningKey> {
    let encoded = row.string("key_material")?;
    let material = STANDARD.decode(encoded.trim()).map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Stored signing key is not valid base64", e)
    })?;
    SigningKey::from_row(row, material)
}
