//! Transactional query interface over the backing relational store.

use async_trait::async_trait;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::sql::{SqlRow, SqlValue};

/// Something that can run parameterized statements.
///
/// Statements use positional `?` placeholders; implementations translate
/// them to the target engine's dialect.
#[async_trait]
pub trait SqlExecutor: Send {
    /// Execute a statement and return the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> AppResult<u64>;

    /// Run a query and return every row.
    async fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<SqlRow>>;

    /// Run a query and return the first row, if any.
    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> AppResult<Option<SqlRow>> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }

    /// Run a query that must return a row.
    async fn fetch_one(&mut self, sql: &str, params: &[SqlValue]) -> AppResult<SqlRow> {
        self.fetch_optional(sql, params)
            .await?
            .ok_or_else(|| AppError::database("Query returned no rows"))
    }
}

/// An atomic unit of work.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] rolls it
/// back.
#[async_trait]
pub trait UnitOfWork: SqlExecutor {
    /// Make every statement of this unit durable.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard every statement of this unit.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// The backing store.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug + 'static {
    /// Begin a new unit of work.
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;

    /// Acquire a plain connection for reads and single-statement writes.
    async fn connection(&self) -> AppResult<Box<dyn SqlExecutor>>;
}
