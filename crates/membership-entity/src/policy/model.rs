//! Policy parameter entity model.

use serde::{Deserialize, Serialize};

use membership_core::result::AppResult;
use membership_core::types::SqlRow;

/// A `(group, key, value)` configuration triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyParameter {
    /// Parameter group, e.g. `"password-rules"`.
    pub group: String,
    /// Key within the group.
    pub key: String,
    /// Raw value.
    pub value: String,
}

impl PolicyParameter {
    /// Decode a `policy_parameters` row.
    pub fn from_row(row: &SqlRow) -> AppResult<Self> {
        Ok(Self {
            group: row.string("param_group")?,
            key: row.string("param_key")?,
            value: row.opt_string("param_value")?.unwrap_or_default(),
        })
    }
}
