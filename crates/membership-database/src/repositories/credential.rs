//! Credential repository implementation.

use chrono::{DateTime, Utc};

use membership_core::result::AppResult;
use membership_core::traits::SqlExecutor;
use membership_core::types::SqlValue;
use membership_entity::credential::Credential;

const CREDENTIAL_COLUMNS: &str =
    "id, account_id, hash, salt, valid_from, valid_until, is_temporary";

/// Repository for password versions.
#[derive(Debug, Clone, Copy)]
pub struct CredentialRepository;

impl CredentialRepository {
    /// The credential whose interval contains `at`, newest first.
    pub async fn find_valid<E>(
        db: &mut E,
        account_id: i64,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Credential>>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials \
             WHERE account_id = ? AND valid_from <= ? AND (valid_until IS NULL OR valid_until > ?) \
             ORDER BY valid_from DESC, id DESC LIMIT 1"
        );
        db.fetch_optional(
            &sql,
            &[
                SqlValue::Int(account_id),
                SqlValue::Timestamp(at),
                SqlValue::Timestamp(at),
            ],
        )
        .await?
        .map(|row| Credential::from_row(&row))
        .transpose()
    }

    /// The `limit` most recent credentials, newest first.
    pub async fn find_recent<E>(db: &mut E, account_id: i64, limit: i64) -> AppResult<Vec<Credential>>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE account_id = ? \
             ORDER BY valid_from DESC, id DESC LIMIT ?"
        );
        db.fetch_all(&sql, &[SqlValue::Int(account_id), SqlValue::Int(limit)])
            .await?
            .iter()
            .map(Credential::from_row)
            .collect()
    }

    /// Every credential of an account, oldest first.
    pub async fn find_by_account<E>(db: &mut E, account_id: i64) -> AppResult<Vec<Credential>>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE account_id = ? \
             ORDER BY valid_from, id"
        );
        db.fetch_all(&sql, &[SqlValue::Int(account_id)])
            .await?
            .iter()
            .map(Credential::from_row)
            .collect()
    }

    /// End every interval of the account still running at `at`.
    pub async fn close_open<E>(db: &mut E, account_id: i64, at: DateTime<Utc>) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "UPDATE credentials SET valid_until = ? \
             WHERE account_id = ? AND (valid_until IS NULL OR valid_until > ?)",
            &[
                SqlValue::Timestamp(at),
                SqlValue::Int(account_id),
                SqlValue::Timestamp(at),
            ],
        )
        .await
    }

    /// Insert a new password version and return its id.
    pub async fn insert<E>(
        db: &mut E,
        account_id: i64,
        hash: &str,
        salt: &str,
        valid_from: DateTime<Utc>,
        valid_until: Option<DateTime<Utc>>,
        is_temporary: bool,
    ) -> AppResult<i64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_one(
            "INSERT INTO credentials (account_id, hash, salt, valid_from, valid_until, is_temporary) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
            &[
                SqlValue::Int(account_id),
                SqlValue::from(hash),
                SqlValue::from(salt),
                SqlValue::Timestamp(valid_from),
                SqlValue::opt_timestamp(valid_until),
                SqlValue::flag(is_temporary),
            ],
        )
        .await?
        .i64("id")
    }
}
