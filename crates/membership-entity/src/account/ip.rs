//! Source-IP allow-list entries.

use serde::{Deserialize, Serialize};

use membership_core::result::AppResult;
use membership_core::types::SqlRow;

/// One address an account may log in from.
///
/// An account with no entries may log in from anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIp {
    /// The account the entry belongs to.
    pub account_id: i64,
    /// The allowed source address, as presented by the client.
    pub ip: String,
}

impl AccountIp {
    /// Decode an `account_ips` row.
    pub fn from_row(row: &SqlRow) -> AppResult<Self> {
        Ok(Self {
            account_id: row.i64("account_id")?,
            ip: row.string("ip")?,
        })
    }
}
