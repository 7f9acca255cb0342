//! Audit log repository implementation.

use chrono::{DateTime, Utc};

use membership_core::audit::AuditEvent;
use membership_core::result::AppResult;
use membership_core::traits::SqlExecutor;
use membership_core::types::SqlValue;
use membership_entity::audit::AuditLogEntry;

const AUDIT_COLUMNS: &str = "id, logged_at, category, status, message, error, details";

/// Repository for audit log entries (append-only).
#[derive(Debug, Clone, Copy)]
pub struct AuditLogRepository;

impl AuditLogRepository {
    /// Append an event.
    pub async fn insert<E>(db: &mut E, event: &AuditEvent, logged_at: DateTime<Utc>) -> AppResult<u64>
    where
        E: SqlExecutor + ?Sized,
    {
        db.execute(
            "INSERT INTO audit_log (logged_at, category, status, message, error, details) \
             VALUES (?, ?, ?, ?, ?, ?)",
            &[
                SqlValue::Timestamp(logged_at),
                SqlValue::from(event.category.as_str()),
                SqlValue::from(event.status.as_str()),
                SqlValue::from(event.message.as_str()),
                SqlValue::opt_text(event.error.as_deref()),
                SqlValue::Text(event.details.to_string()),
            ],
        )
        .await
    }

    /// The most recent entries, newest first, optionally filtered by category.
    pub async fn find_recent<E>(
        db: &mut E,
        category: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<AuditLogEntry>>
    where
        E: SqlExecutor + ?Sized,
    {
        let rows = match category {
            Some(category) => {
                let sql = format!(
                    "SELECT {AUDIT_COLUMNS} FROM audit_log WHERE category = ? \
                     ORDER BY logged_at DESC, id DESC LIMIT ?"
                );
                db.fetch_all(&sql, &[SqlValue::from(category), SqlValue::Int(limit)])
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {AUDIT_COLUMNS} FROM audit_log ORDER BY logged_at DESC, id DESC LIMIT ?"
                );
                db.fetch_all(&sql, &[SqlValue::Int(limit)]).await?
            }
        };
        rows.iter().map(AuditLogEntry::from_row).collect()
    }
}
