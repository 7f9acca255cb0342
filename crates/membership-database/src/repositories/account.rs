//! Account repository implementation.

use chrono::{DateTime, Utc};

use membership_core::result::AppResult;
use membership_core::traits::SqlExecutor;
use membership_core::types::SqlValue;
use membership_entity::account::{Account, CreateAccount, FailureWindow};

const ACCOUNT_COLUMNS: &str = "id, user_name, name, surname, email, is_activated, is_valid, \
    is_locked, password_changed_at, created_at, updated_at, activated_at, last_connect_at, \
    last_connect_ip";

/// Repository for account rows.
#[derive(Debug, Clone, Copy)]
pub struct AccountRepository;

impl AccountRepository {
    /// Find an account by primary key.
    pub async fn find_by_id<E>(db: &mut E, id: i64) -> AppResult<Option<Account>>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?");
        db.fetch_optional(&sql, &[SqlValue::Int(id)])
            .await?
            .map(|row| Account::from_row(&row))
            .transpose()
    }

    /// Find an account by username (case-insensitive).
    pub async fn find_by_username<E>(db: &mut E, username: &str) -> AppResult<Option<Account>>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE LOWER(user_name) = LOWER(?)");
        db.fetch_optional(&sql, &[SqlValue::from(username)])
            .await?
            .map(|row| Account::from_row(&row))
            .transpose()
    }

    /// List all accounts ordered by username.
    pub async fn find_all<E>(db: &mut E) -> AppResult<Vec<Account>>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY LOWER(user_name)");
        db.fetch_all(&sql, &[])
            .await?
            .iter()
            .map(Account::from_row)
            .collect()
    }

    /// Whether another account already uses this username (case-insensitive).
    pub async fn username_taken<E>(db: &mut E, username: &str) -> AppResult<bool>
    where
        E: SqlExecutor + ?Sized,
    {
        let row = db
            .fetch_one(
                "SELECT COUNT(*) AS n FROM accounts WHERE LOWER(user_name) = LOWER(?)",
                &[SqlValue::from(username)],
            )
            .await?;
        Ok(row.i64("n")? > 0)
    }

    /// Whether another account already uses this email (case-insensitive).
    pub async fn email_taken<E>(db: &mut E, email: &str) -> AppResult<bool>
    where
        E: SqlExecutor + ?Sized,
    {
        let row = db
            .fetch_one(
                "SELECT COUNT(*) AS n FROM accounts WHERE LOWER(email) = LOWER(?)",
                &[SqlValue::from(email)],
            )
            .await?;
        Ok(row.i64("n")? > 0)
    }

    /// Insert a new, unactivated account and return its id.
    pub async fn create<E>(db: &mut E, data: &CreateAccount, now: DateTime<Utc>) -> AppResult<i64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_one(
            "INSERT INTO accounts (user_name, name, surname, email, is_activated, is_valid, \
             is_locked, failed_attempts, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 0, 1, 0, 0, ?, ?) RETURNING id",
            &[
                SqlValue::from(data.username.as_str()),
                SqlValue::from(data.name.as_str()),
                SqlValue::from(data.surname.as_str()),
                SqlValue::from(data.email.as_str()),
                SqlValue::Timestamp(now),
                SqlValue::Timestamp(now),
            ],
        )
        .await?
        .i64("id")
    }

    /// Set the activation flag and time. Returns `false` if the account was
    /// already active or does not exist.
    pub async fn activate<E>(db: &mut E, id: i64, now: DateTime<Utc>) -> AppResult<bool>
    where
        E: SqlExecutor + ?Sized,
    {
        let affected = db
            .execute(
                "UPDATE accounts SET is_activated = 1, activated_at = ?, updated_at = ? \
                 WHERE id = ? AND is_activated = 0",
                &[
                    SqlValue::Timestamp(now),
                    SqlValue::Timestamp(now),
                    SqlValue::Int(id),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    /// Read the failure counters of an account.
    pub async fn failure_window<E>(db: &mut E, id: i64) -> AppResult<Option<FailureWindow>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_optional(
            "SELECT failed_attempts, first_failed_at, last_failed_at, is_locked \
             FROM accounts WHERE id = ?",
            &[SqlValue::Int(id)],
        )
        .await?
        .map(|row| FailureWindow::from_row(&row))
        .transpose()
    }

    /// Persist new failure counters.
    pub async fn update_failure_window<E>(
        db: &mut E,
        id: i64,
        window: &FailureWindow,
        now: DateTime<Utc>,
    ) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "UPDATE accounts SET failed_attempts = ?, first_failed_at = ?, last_failed_at = ?, \
             updated_at = ? WHERE id = ?",
            &[
                SqlValue::Int(window.failed_attempts),
                SqlValue::opt_timestamp(window.first_failed_at),
                SqlValue::opt_timestamp(window.last_failed_at),
                SqlValue::Timestamp(now),
                SqlValue::Int(id),
            ],
        )
        .await
    }

    /// Set the lock flag.
    pub async fn lock<E>(db: &mut E, id: i64, now: DateTime<Utc>) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "UPDATE accounts SET is_locked = 1, updated_at = ? WHERE id = ?",
            &[SqlValue::Timestamp(now), SqlValue::Int(id)],
        )
        .await
    }

    /// Clear the lock flag and the failure counters.
    pub async fn unlock<E>(db: &mut E, id: i64, now: DateTime<Utc>) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "UPDATE accounts SET is_locked = 0, failed_attempts = 0, first_failed_at = NULL, \
             last_failed_at = NULL, updated_at = ? WHERE id = ?",
            &[SqlValue::Timestamp(now), SqlValue::Int(id)],
        )
        .await
    }

    /// Record the time of the latest password change.
    pub async fn set_password_changed<E>(db: &mut E, id: i64, now: DateTime<Utc>) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "UPDATE accounts SET password_changed_at = ?, updated_at = ? WHERE id = ?",
            &[
                SqlValue::Timestamp(now),
                SqlValue::Timestamp(now),
                SqlValue::Int(id),
            ],
        )
        .await
    }

    /// Stamp the last successful login.
    pub async fn record_connect<E>(
        db: &mut E,
        id: i64,
        ip: &str,
        now: DateTime<Utc>,
    ) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "UPDATE accounts SET last_connect_at = ?, last_connect_ip = ? WHERE id = ?",
            &[
                SqlValue::Timestamp(now),
                SqlValue::from(ip),
                SqlValue::Int(id),
            ],
        )
        .await
    }
}
