//! Audit sink trait.

use async_trait::async_trait;

use crate::audit::{AuditEvent, AuditStatus};
use crate::result::AppResult;

/// Receives an entry after every security-relevant decision.
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug + 'static {
    /// Record one audit event.
    async fn record(&self, event: &AuditEvent) -> AppResult<()>;

    /// Record an event, swallowing and logging any failure.
    async fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.record(&event).await {
            tracing::warn!(
                category = %event.category,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }
}

/// Writes audit events to the `tracing` pipeline under the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> AppResult<()> {
        let details = event.details.to_string();
        match event.status {
            AuditStatus::Success => tracing::info!(
                target: "audit",
                category = %event.category,
                details = %details,
                "{}",
                event.message
            ),
            AuditStatus::Failure => tracing::warn!(
                target: "audit",
                category = %event.category,
                error = event.error.as_deref().unwrap_or(""),
                details = %details,
                "{}",
                event.message
            ),
        }
        Ok(())
    }
}
