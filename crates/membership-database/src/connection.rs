//! Connection pool management and the [`Store`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, AnyPool, Column, Row, Transaction};
use tracing::{debug, info};

use membership_core::config::DatabaseConfig;
use membership_core::error::{AppError, ErrorKind};
use membership_core::result::AppResult;
use membership_core::traits::{SqlExecutor, Store, UnitOfWork};
use membership_core::types::{SqlRow, SqlValue};

use crate::dialect::Dialect;

/// A [`Store`] over a `sqlx` connection pool.
///
/// The engine is chosen by the URL scheme; statements written with `?`
/// placeholders are rewritten for it before execution.
#[derive(Debug, Clone)]
pub struct SqlStore {
    /// The underlying sqlx connection pool.
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlStore {
    /// Create a new store from configuration.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        sqlx::any::install_default_drivers();
        let dialect = Dialect::from_url(&config.url)?;

        info!(
            url = %mask_password(&config.url),
            dialect = ?dialect,
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let mut options = AnyPoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds));

        // A private in-memory database lives exactly as long as its one connection.
        options = if config.is_in_memory() {
            options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options
                .max_connections(config.max_connections)
                .min_connections(config.min_connections.min(config.max_connections))
                .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        };

        let pool = options.connect(&config.url).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to connect to database: {e}"),
                e,
            )
        })?;

        info!("Successfully connected to database");
        Ok(Self { pool, dialect })
    }

    /// The engine this store talks to.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let row = conn
            .fetch_one("SELECT CAST(1 AS BIGINT) AS ok", &[])
            .await?;
        Ok(row.i64("ok")? == 1)
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

#[async_trait]
impl Store for SqlStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin unit of work", e)
        })?;
        Ok(Box::new(SqlUnitOfWork {
            tx,
            dialect: self.dialect,
        }))
    }

    async fn connection(&self) -> AppResult<Box<dyn SqlExecutor>> {
        let conn = self.pool.acquire().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e)
        })?;
        Ok(Box::new(SqlConnection {
            conn,
            dialect: self.dialect,
        }))
    }
}

/// A pooled connection outside any unit of work.
struct SqlConnection {
    conn: PoolConnection<Any>,
    dialect: Dialect,
}

#[async_trait]
impl SqlExecutor for SqlConnection {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> AppResult<u64> {
        execute_on(&mut self.conn, self.dialect, sql, params).await
    }

    async fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<SqlRow>> {
        fetch_on(&mut self.conn, self.dialect, sql, params).await
    }
}

/// A database transaction. Dropping it without commit rolls back.
struct SqlUnitOfWork {
    tx: Transaction<'static, Any>,
    dialect: Dialect,
}

#[async_trait]
impl SqlExecutor for SqlUnitOfWork {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> AppResult<u64> {
        execute_on(&mut self.tx, self.dialect, sql, params).await
    }

    async fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<SqlRow>> {
        fetch_on(&mut self.tx, self.dialect, sql, params).await
    }
}

#[async_trait]
impl UnitOfWork for SqlUnitOfWork {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit unit of work", e)
        })
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to roll back unit of work", e)
        })
    }
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, Any, sqlx::any::AnyArguments<'q>>,
    params: &[&SqlValue],
) -> sqlx::query::Query<'q, Any, sqlx::any::AnyArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bytes(v) => query.bind(v.clone()),
            SqlValue::Timestamp(v) => query.bind(v.timestamp_micros()),
            // Nulls are inlined as literals by the dialect translation.
            SqlValue::Null => query,
        };
    }
    query
}

async fn execute_on(
    conn: &mut AnyConnection,
    dialect: Dialect,
    sql: &str,
    params: &[SqlValue],
) -> AppResult<u64> {
    let (translated, bound) = dialect.translate(sql, params)?;
    debug!(sql = %translated, params = bound.len(), "Executing statement");

    let result = bind_all(sqlx::query(&translated), &bound)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to execute statement"))?;
    Ok(result.rows_affected())
}

async fn fetch_on(
    conn: &mut AnyConnection,
    dialect: Dialect,
    sql: &str,
    params: &[SqlValue],
) -> AppResult<Vec<SqlRow>> {
    let (translated, bound) = dialect.translate(sql, params)?;
    debug!(sql = %translated, params = bound.len(), "Running query");

    let rows = bind_all(sqlx::query(&translated), &bound)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to run query"))?;
    rows.iter().map(decode_row).collect()
}

fn decode_row(row: &AnyRow) -> AppResult<SqlRow> {
    let mut columns = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            v.map_or(SqlValue::Null, SqlValue::Int)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            v.map_or(SqlValue::Null, SqlValue::Text)
        } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
            v.map_or(SqlValue::Null, SqlValue::Bytes)
        } else {
            return Err(AppError::database(format!(
                "Unsupported type for column '{}'",
                column.name()
            )));
        };
        columns.push((column.name().to_string(), value));
    }

    Ok(SqlRow::new(columns))
}

fn map_sqlx_error(err: sqlx::Error, context: &str) -> AppError {
    let kind = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::Conflict,
        _ => ErrorKind::Database,
    };
    AppError::with_source(kind, format!("{context}: {err}"), err)
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
