//! Audit sink that persists events to the `audit_log` table.

use std::sync::Arc;

use async_trait::async_trait;

use membership_core::audit::AuditEvent;
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, Clock, Store};

use crate::repositories::AuditLogRepository;

/// Writes every audit event to the store on its own connection.
///
/// Must not be called while the caller holds a unit of work on a
/// single-connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseAuditSink {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl DatabaseAuditSink {
    /// Create a new database audit sink.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl AuditSink for DatabaseAuditSink {
    async fn record(&self, event: &AuditEvent) -> AppResult<()> {
        let mut conn = self.store.connection().await?;
        AuditLogRepository::insert(&mut *conn, event, self.clock.now()).await?;
        tracing::debug!(category = %event.category, status = %event.status, "Audit entry written");
        Ok(())
    }
}
