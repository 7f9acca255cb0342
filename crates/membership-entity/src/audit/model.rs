//! Audit log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use membership_core::result::AppResult;
use membership_core::types::SqlRow;

/// A persisted audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Row identifier.
    pub id: i64,
    /// When the event was written.
    pub logged_at: DateTime<Utc>,
    /// Event category (e.g. `"login"`, `"lockout"`).
    pub category: String,
    /// `"success"` or `"failure"`.
    pub status: String,
    /// Human-readable summary.
    pub message: String,
    /// Failure reason.
    pub error: Option<String>,
    /// Structured context.
    pub details: serde_json::Value,
}

impl AuditLogEntry {
    /// Decode an `audit_log` row.
    pub fn from_row(row: &SqlRow) -> AppResult<Self> {
        let details = match row.opt_string("details")? {
            Some(raw) if !raw.is_empty() => serde_json::from_str(&raw)?,
            _ => serde_json::Value::Null,
        };

        Ok(Self {
            id: row.i64("id")?,
            logged_at: row.timestamp("logged_at")?,
            category: row.string("category")?,
            status: row.string("status")?,
            message: row.string("message")?,
            error: row.opt_string("error")?,
            details,
        })
    }
}
