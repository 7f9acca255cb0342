//! Account entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use membership_core::result::AppResult;
use membership_core::types::SqlRow;

/// A registered account.
///
/// Username and email are unique without regard to case. An account that
/// has not been activated never authenticates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Numeric identifier, assigned at creation.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Email address.
    pub email: String,
    /// Whether the account has been activated.
    pub is_activated: bool,
    /// Whether the account is administratively valid.
    pub is_valid: bool,
    /// Whether the account is locked after repeated failures.
    pub is_locked: bool,
    /// When the password was last changed.
    pub password_changed_at: Option<DateTime<Utc>>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account row was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the account was activated.
    pub activated_at: Option<DateTime<Utc>>,
    /// Last successful login time.
    pub last_connect_at: Option<DateTime<Utc>>,
    /// Source IP of the last successful login.
    pub last_connect_ip: Option<String>,
}

impl Account {
    /// Decode an `accounts` row.
    pub fn from_row(row: &SqlRow) -> AppResult<Self> {
        Ok(Self {
            id: row.i64("id")?,
            username: row.string("user_name")?,
            name: row.opt_string("name")?.unwrap_or_default(),
            surname: row.opt_string("surname")?.unwrap_or_default(),
            email: row.string("email")?,
            is_activated: row.flag("is_activated")?,
            is_valid: row.flag("is_valid")?,
            is_locked: row.flag("is_locked")?,
            password_changed_at: row.opt_timestamp("password_changed_at")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
            activated_at: row.opt_timestamp("activated_at")?,
            last_connect_at: row.opt_timestamp("last_connect_at")?,
            last_connect_ip: row.opt_string("last_connect_ip")?,
        })
    }

    /// Whether the account may attempt to authenticate at all.
    pub fn can_login(&self) -> bool {
        self.is_activated && self.is_valid && !self.is_locked
    }

    /// `"name surname"`, trimmed.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

/// Data required to create a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    /// Desired login name.
    pub username: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Email address.
    pub email: String,
}

/// The failure counters of the current lockout window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureWindow {
    /// Failures counted in the current window.
    pub failed_attempts: i64,
    /// First failure of the current window.
    pub first_failed_at: Option<DateTime<Utc>>,
    /// Most recent failure.
    pub last_failed_at: Option<DateTime<Utc>>,
    /// Lock flag as persisted.
    pub is_locked: bool,
}

impl FailureWindow {
    /// Decode the failure columns of an `accounts` row.
    pub fn from_row(row: &SqlRow) -> AppResult<Self> {
        Ok(Self {
            failed_attempts: row.opt_i64("failed_attempts")?.unwrap_or(0),
            first_failed_at: row.opt_timestamp("first_failed_at")?,
            last_failed_at: row.opt_timestamp("last_failed_at")?,
            is_locked: row.flag("is_locked")?,
        })
    }
}
