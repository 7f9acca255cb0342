//! Role assignment entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use membership_core::result::AppResult;
use membership_core::types::SqlRow;

/// Membership of an account in a role over `[valid_from, valid_until)`.
///
/// Live assignments are open; revoked ones are closed and archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Member account.
    pub account_id: i64,
    /// Assigned role.
    pub role_id: i64,
    /// Start of the assignment.
    pub valid_from: DateTime<Utc>,
    /// End of the assignment, exclusive.
    pub valid_until: Option<DateTime<Utc>>,
}

impl RoleAssignment {
    /// Decode an `account_roles` or `account_role_history` row.
    pub fn from_row(row: &SqlRow) -> AppResult<Self> {
        Ok(Self {
            account_id: row.i64("account_id")?,
            role_id: row.i64("role_id")?,
            valid_from: row.timestamp("valid_from")?,
            valid_until: row.opt_timestamp("valid_until")?,
        })
    }

    /// Whether the assignment is in force at `at`.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_until.is_none_or(|until| at < until)
    }
}
