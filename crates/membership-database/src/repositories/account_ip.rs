//! Source-IP allow-list repository.

use membership_core::result::AppResult;
use membership_core::traits::SqlExecutor;
use membership_core::types::SqlValue;
use membership_entity::account::AccountIp;

/// Repository for `account_ips` rows.
#[derive(Debug, Clone, Copy)]
pub struct AccountIpRepository;

impl AccountIpRepository {
    /// Every address an account may log in from.
    pub async fn find_by_account<E>(db: &mut E, account_id: i64) -> AppResult<Vec<AccountIp>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_all(
            "SELECT account_id, ip FROM account_ips WHERE account_id = ? ORDER BY ip",
            &[SqlValue::Int(account_id)],
        )
        .await?
        .iter()
        .map(AccountIp::from_row)
        .collect()
    }

    /// Add an address. Adding an existing one is a no-op.
    pub async fn insert<E>(db: &mut E, account_id: i64, ip: &str) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "INSERT INTO account_ips (account_id, ip) VALUES (?, ?) \
             ON CONFLICT (account_id, ip) DO NOTHING",
            &[SqlValue::Int(account_id), SqlValue::from(ip)],
        )
        .await
    }

    /// Remove an address.
    pub async fn delete<E>(db: &mut E, account_id: i64, ip: &str) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "DELETE FROM account_ips WHERE account_id = ? AND ip = ?",
            &[SqlValue::Int(account_id), SqlValue::from(ip)],
        )
        .await
    }
}
