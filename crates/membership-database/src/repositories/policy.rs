//! Policy parameter repository.

use membership_core::result::AppResult;
use membership_core::traits::SqlExecutor;
use membership_core::types::SqlValue;
use membership_entity::policy::PolicyParameter;

/// Repository for `(group, key, value)` parameters.
#[derive(Debug, Clone, Copy)]
pub struct PolicyRepository;

impl PolicyRepository {
    /// Every parameter of a group.
    pub async fn find_group<E>(db: &mut E, group: &str) -> AppResult<Vec<PolicyParameter>>
    where
        E: SqlExecutor + ?Sized,
    {
        db.fetch_all(
            "SELECT param_group, param_key, param_value FROM policy_parameters \
             WHERE param_group = ? ORDER BY param_key",
            &[SqlValue::from(group)],
        )
        .await?
        .iter()
        .map(PolicyParameter::from_row)
        .collect()
    }

    /// Insert or overwrite one parameter.
    pub async fn upsert<E>(db: &mut E, group: &str, key: &str, value: &str) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "INSERT INTO policy_parameters (param_group, param_key, param_value) VALUES (?, ?, ?) \
             ON CONFLICT (param_group, param_key) DO UPDATE SET param_value = excluded.param_value",
            &[
                SqlValue::from(group),
                SqlValue::from(key),
                SqlValue::from(value),
            ],
        )
        .await
    }

    /// Insert one parameter unless it already exists.
    pub async fn insert_missing<E>(db: &mut E, group: &str, key: &str, value: &str) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "INSERT INTO policy_parameters (param_group, param_key, param_value) VALUES (?, ?, ?) \
             ON CONFLICT (param_group, param_key) DO NOTHING",
            &[
                SqlValue::from(group),
                SqlValue::from(key),
                SqlValue::from(value),
            ],
        )
        .await
    }
}
