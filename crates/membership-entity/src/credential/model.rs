//! Credential entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use membership_core::result::AppResult;
use membership_core::types::SqlRow;

/// One password version of an account.
///
/// The credential is current over `[valid_from, valid_until)`; an open
/// interval (`valid_until = None`) never expires. At most one credential
/// per account is open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Row identifier.
    pub id: i64,
    /// Owning account.
    pub account_id: i64,
    /// Password hash, computed over salt and password.
    #[serde(skip_serializing)]
    pub hash: String,
    /// Salt the hash was computed with.
    #[serde(skip_serializing)]
    pub salt: String,
    /// Start of the validity interval.
    pub valid_from: DateTime<Utc>,
    /// End of the validity interval, exclusive.
    pub valid_until: Option<DateTime<Utc>>,
    /// Whether the password must be changed at next login.
    pub is_temporary: bool,
}

impl Credential {
    /// Decode a `credentials` row.
    pub fn from_row(row: &SqlRow) -> AppResult<Self> {
        Ok(Self {
            id: row.i64("id")?,
            account_id: row.i64("account_id")?,
            hash: row.string("hash")?,
            salt: row.string("salt")?,
            valid_from: row.timestamp("valid_from")?,
            valid_until: row.opt_timestamp("valid_until")?,
            is_temporary: row.flag("is_temporary")?,
        })
    }

    /// Whether the interval contains `at`.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_until.is_none_or(|until| at < until)
    }
}
