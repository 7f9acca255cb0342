//! Typed requests and the closed set of responses.

use serde::{Deserialize, Serialize};

use membership_entity::session::Session;

use crate::account::{ChangePasswordRequest, RegisterRequest};

/// Payload of a dispatched operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    /// Username and password login.
    Login {
        /// Login name.
        username: String,
        /// Password.
        password: String,
    },
    /// End the session presented in the request context.
    Logout,
    /// Create an account.
    Register(RegisterRequest),
    /// Change the password of the session's account.
    ChangePassword(ChangePasswordRequest),
}

impl Request {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::Register(_) => "register",
            Self::ChangePassword(_) => "change-password",
        }
    }
}

/// Every answer an operation can give.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Response {
    /// Login succeeded.
    LoggedIn {
        /// The new session.
        session: Session,
        /// Signed session token.
        token: String,
    },
    /// Login refused.
    LoginFailed {
        /// User-facing message.
        message: String,
    },
    /// Session ended.
    LoggedOut {
        /// Account whose session ended.
        account_id: i64,
    },
    /// Account created.
    Registered {
        /// The new account's identifier.
        account_id: i64,
    },
    /// The password broke a rule; no account was created.
    RegistrationRejected {
        /// Rule that was broken.
        message: String,
    },
    /// Password changed.
    PasswordChanged {
        /// Token carrying the refreshed session.
        token: String,
    },
    /// Password change refused.
    PasswordRejected {
        /// User-facing reason.
        message: String,
    },
}

impl Response {
    /// Whether the operation did what was asked.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::LoggedIn { .. }
                | Self::LoggedOut { .. }
                | Self::Registered { .. }
                | Self::PasswordChanged { .. }
        )
    }
}
