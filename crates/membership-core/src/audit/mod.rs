//! Audit events emitted by the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What an audit event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditCategory {
    /// A login attempt.
    Login,
    /// A logout.
    Logout,
    /// An account registration.
    Register,
    /// An account activation.
    Activate,
    /// A password change or reset.
    PasswordChange,
    /// A lockout counter update, lock, or unlock.
    Lockout,
    /// A role creation, rename, assignment, or revocation.
    Role,
    /// Signing key generation.
    SessionKeys,
    /// Source-IP allow-list maintenance.
    IpAllowList,
}

impl AuditCategory {
    /// Stable string form, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Register => "register",
            Self::Activate => "activate",
            Self::PasswordChange => "password-change",
            Self::Lockout => "lockout",
            Self::Role => "role",
            Self::SessionKeys => "session-keys",
            Self::IpAllowList => "ip-allow-list",
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded with an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// The operation succeeded.
    Success,
    /// The operation was rejected or failed.
    Failure,
}

impl AuditStatus {
    /// Stable string form, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event category.
    pub category: AuditCategory,
    /// Outcome.
    pub status: AuditStatus,
    /// Human-readable summary.
    pub message: String,
    /// Failure reason, if any.
    pub error: Option<String>,
    /// Structured context (account id, username, role, IP, ...).
    pub details: serde_json::Value,
}

impl AuditEvent {
    /// A successful event.
    pub fn success(category: AuditCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            status: AuditStatus::Success,
            message: message.into(),
            error: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// A failed event with its reason.
    pub fn failure(
        category: AuditCategory,
        message: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            category,
            status: AuditStatus::Failure,
            message: message.into(),
            error: Some(error.into()),
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Attach one key/value pair of structured context.
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        if let serde_json::Value::Object(map) = &mut self.details {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    /// Whether this event records a failure.
    pub fn is_failure(&self) -> bool {
        self.status == AuditStatus::Failure
    }
}
