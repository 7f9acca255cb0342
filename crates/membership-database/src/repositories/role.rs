//! Role repository implementation.

use membership_core::result::AppResult;
use membership_core::traits::SqlExecutor;
use membership_core::types::SqlValue;
use membership_entity::role::Role;

/// Repository for role rows.
#[derive(Debug, Clone, Copy)]
pub struct RoleRepository;

impl RoleRepository {
    /// Find a role by primary key.
    pub async fn find_by_id<E>(db: &mut E, id: i64) -> AppResult<Option<Role>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_optional("SELECT id, name FROM roles WHERE id = ?", &[SqlValue::Int(id)])
            .await?
            .map(|row| Role::from_row(&row))
            .transpose()
    }

    /// Find a role by name (case-insensitive).
    pub async fn find_by_name<E>(db: &mut E, name: &str) -> AppResult<Option<Role>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_optional(
            "SELECT id, name FROM roles WHERE LOWER(name) = LOWER(?)",
            &[SqlValue::from(name)],
        )
        .await?
        .map(|row| Role::from_row(&row))
        .transpose()
    }

    /// List every role ordered by name.
    pub async fn find_all<E>(db: &mut E) -> AppResult<Vec<Role>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_all("SELECT id, name FROM roles ORDER BY LOWER(name)", &[])
            .await?
            .iter()
            .map(Role::from_row)
            .collect()
    }

    /// Insert a role and return its id.
    pub async fn insert<E>(db: &mut E, name: &str) -> AppResult<i64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_one(
            "INSERT INTO roles (name) VALUES (?) RETURNING id",
            &[SqlValue::from(name)],
        )
        .await?
        .i64("id")
    }

    /// Rename a role.
    pub async fn rename<E>(db: &mut E, id: i64, name: &str) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "UPDATE roles SET name = ? WHERE id = ?",
            &[SqlValue::from(name), SqlValue::Int(id)],
        )
        .await
    }
}
