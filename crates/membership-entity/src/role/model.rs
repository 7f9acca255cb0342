//! Role entity model.

use serde::{Deserialize, Serialize};

use membership_core::result::AppResult;
use membership_core::types::SqlRow;

/// A named role. Names are unique without regard to case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier.
    pub id: i64,
    /// Role name.
    pub name: String,
}

impl Role {
    /// Decode a `roles` row.
    pub fn from_row(row: &SqlRow) -> AppResult<Self> {
        Ok(Self {
            id: row.i64("id")?,
            name: row.string("name")?,
        })
    }
}
