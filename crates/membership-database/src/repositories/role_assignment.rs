//! Role assignment repository.
//!
//! Live assignments sit in `account_roles`; revoked ones are archived to
//! `account_role_history`. Temporal queries look at both tables.

use chrono::{DateTime, Utc};

use membership_core::result::AppResult;
use membership_core::traits::SqlExecutor;
use membership_core::types::SqlValue;
use membership_entity::role::RoleAssignment;

/// Repository for live and archived role assignments.
#[derive(Debug, Clone, Copy)]
pub struct RoleAssignmentRepository;

impl RoleAssignmentRepository {
    /// The live assignment of `role_id` in force at `at`, if any.
    pub async fn find_active<E>(
        db: &mut E,
        account_id: i64,
        role_id: i64,
        at: DateTime<Utc>,
    ) -> AppResult<Option<RoleAssignment>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_optional(
            "SELECT account_id, role_id, valid_from, valid_until FROM account_roles \
             WHERE account_id = ? AND role_id = ? AND valid_from <= ? \
             AND (valid_until IS NULL OR valid_until > ?) \
             ORDER BY valid_from DESC LIMIT 1",
            &[
                SqlValue::Int(account_id),
                SqlValue::Int(role_id),
                SqlValue::Timestamp(at),
                SqlValue::Timestamp(at),
            ],
        )
        .await?
        .map(|row| RoleAssignment::from_row(&row))
        .transpose()
    }

    /// The earliest live assignment of `role_id` still in force at or after
    /// `from`, whether it started before `from` or starts later.
    pub async fn find_overlapping<E>(
        db: &mut E,
        account_id: i64,
        role_id: i64,
        from: DateTime<Utc>,
    ) -> AppResult<Option<RoleAssignment>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_optional(
            "SELECT account_id, role_id, valid_from, valid_until FROM account_roles \
             WHERE account_id = ? AND role_id = ? \
             AND (valid_until IS NULL OR valid_until > ?) \
             ORDER BY valid_from LIMIT 1",
            &[
                SqlValue::Int(account_id),
                SqlValue::Int(role_id),
                SqlValue::Timestamp(from),
            ],
        )
        .await?
        .map(|row| RoleAssignment::from_row(&row))
        .transpose()
    }

    /// Move the start of a live assignment to `valid_from`.
    pub async fn reschedule<E>(
        db: &mut E,
        assignment: &RoleAssignment,
        valid_from: DateTime<Utc>,
    ) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "UPDATE account_roles SET valid_from = ? \
             WHERE account_id = ? AND role_id = ? AND valid_from = ?",
            &[
                SqlValue::Timestamp(valid_from),
                SqlValue::Int(assignment.account_id),
                SqlValue::Int(assignment.role_id),
                SqlValue::Timestamp(assignment.valid_from),
            ],
        )
        .await
    }

    /// Insert an open-ended live assignment.
    pub async fn insert<E>(
        db: &mut E,
        account_id: i64,
        role_id: i64,
        valid_from: DateTime<Utc>,
    ) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "INSERT INTO account_roles (account_id, role_id, valid_from, valid_until) \
             VALUES (?, ?, ?, NULL)",
            &[
                SqlValue::Int(account_id),
                SqlValue::Int(role_id),
                SqlValue::Timestamp(valid_from),
            ],
        )
        .await
    }

    /// Close a live assignment at `at`.
    pub async fn close<E>(db: &mut E, assignment: &RoleAssignment, at: DateTime<Utc>) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "UPDATE account_roles SET valid_until = ? \
             WHERE account_id = ? AND role_id = ? AND valid_from = ?",
            &[
                SqlValue::Timestamp(at),
                SqlValue::Int(assignment.account_id),
                SqlValue::Int(assignment.role_id),
                SqlValue::Timestamp(assignment.valid_from),
            ],
        )
        .await
    }

    /// Copy a closed live assignment into the history table.
    pub async fn archive<E>(
        db: &mut E,
        assignment: &RoleAssignment,
        archived_at: DateTime<Utc>,
    ) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "INSERT INTO account_role_history (account_id, role_id, valid_from, valid_until, archived_at) \
             SELECT account_id, role_id, valid_from, valid_until, ? FROM account_roles \
             WHERE account_id = ? AND role_id = ? AND valid_from = ?",
            &[
                SqlValue::Timestamp(archived_at),
                SqlValue::Int(assignment.account_id),
                SqlValue::Int(assignment.role_id),
                SqlValue::Timestamp(assignment.valid_from),
            ],
        )
        .await
    }

    /// Remove a live assignment.
    pub async fn delete<E>(db: &mut E, assignment: &RoleAssignment) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "DELETE FROM account_roles WHERE account_id = ? AND role_id = ? AND valid_from = ?",
            &[
                SqlValue::Int(assignment.account_id),
                SqlValue::Int(assignment.role_id),
                SqlValue::Timestamp(assignment.valid_from),
            ],
        )
        .await
    }

    /// Names of every role, live or archived, whose interval contains `at`.
    pub async fn effective_role_names<E>(
        db: &mut E,
        account_id: i64,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<String>>
    where
        E: SqlExecutor + ?Sized,
    {
        let rows = db
            .fetch_all(
                "SELECT DISTINCT r.name AS name FROM roles r JOIN ( \
                     SELECT role_id, valid_from, valid_until FROM account_roles WHERE account_id = ? \
                     UNION ALL \
                     SELECT role_id, valid_from, valid_until FROM account_role_history WHERE account_id = ? \
                 ) a ON a.role_id = r.id \
                 WHERE a.valid_from <= ? AND (a.valid_until IS NULL OR a.valid_until > ?) \
                 ORDER BY name",
                &[
                    SqlValue::Int(account_id),
                    SqlValue::Int(account_id),
                    SqlValue::Timestamp(at),
                    SqlValue::Timestamp(at),
                ],
            )
            .await?;
        rows.iter().map(|row| row.string("name")).collect()
    }

    /// Live assignments of an account.
    pub async fn find_live<E>(db: &mut E, account_id: i64) -> AppResult<Vec<RoleAssignment>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_all(
            "SELECT account_id, role_id, valid_from, valid_until FROM account_roles \
             WHERE account_id = ? ORDER BY valid_from",
            &[SqlValue::Int(account_id)],
        )
        .await?
        .iter()
        .map(RoleAssignment::from_row)
        .collect()
    }

    /// Archived assignments of an account.
    pub async fn find_history<E>(db: &mut E, account_id: i64) -> AppResult<Vec<RoleAssignment>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_all(
            "SELECT account_id, role_id, valid_from, valid_until FROM account_role_history \
             WHERE account_id = ? ORDER BY valid_from",
            &[SqlValue::Int(account_id)],
        )
        .await?
        .iter()
        .map(RoleAssignment::from_row)
        .collect()
    }
}
