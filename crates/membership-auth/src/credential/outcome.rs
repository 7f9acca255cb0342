//! Typed results of credential operations.
//!
//! Rejections are outcomes, not errors: an `Err` from the credential
//! validator always means the store or the hasher failed.

use thiserror::Error;

use membership_entity::account::Account;

use crate::password::PolicyViolation;

/// Result of storing a new password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordOutcome {
    /// The password was stored as credential `credential_id`.
    Stored {
        /// Id of the new credential row.
        credential_id: i64,
    },
    /// The password broke a rule; nothing was written.
    Rejected(PolicyViolation),
}

impl PasswordOutcome {
    /// Whether the password was stored.
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

/// Why a login was refused.
///
/// The reason is for audit and logs only; clients always get the same
/// generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginFailure {
    /// No account with that username.
    #[error("username not found")]
    UnknownUser,
    /// The account has no currently valid credential.
    #[error("password expired or not set")]
    NoValidCredential,
    /// The account is locked.
    #[error("account is locked out")]
    Locked,
    /// The account has not been activated.
    #[error("account is not activated")]
    NotActivated,
    /// The account has been invalidated.
    #[error("account is not valid")]
    Invalid,
    /// The source address is not on the account's allow-list.
    #[error("IP not accepted")]
    IpNotAllowed,
    /// The password did not match.
    #[error("wrong password")]
    WrongPassword,
}

/// Result of a login attempt.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// The password matched.
    Ok(Account),
    /// The password matched a temporary credential that must be changed.
    TemporaryPassword(Account),
    /// The login was refused.
    Failed(LoginFailure),
}

impl LoginOutcome {
    /// The authenticated account, if the login succeeded.
    pub fn account(&self) -> Option<&Account> {
        match self {
            Self::Ok(account) | Self::TemporaryPassword(account) => Some(account),
            Self::Failed(_) => None,
        }
    }

    /// Whether the login succeeded.
    pub fn is_success(&self) -> bool {
        self.account().is_some()
    }
}
