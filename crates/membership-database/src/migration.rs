//! Schema migrations.
//!
//! The schema is kept portable between PostgreSQL and SQLite: integers are
//! `BIGINT`, flags are `0`/`1` integers, and timestamps are microseconds
//! since the Unix epoch. Case-insensitive uniqueness uses expression
//! indexes on `LOWER(...)`, which both engines support.

use tracing::{debug, info};

use membership_core::error::ErrorKind;
use membership_core::result::AppResult;
use membership_core::traits::Store;
use membership_core::types::SqlValue;

use crate::dialect::Dialect;

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// Version 1 of the schema. `{pk}` is replaced by the dialect's
/// auto-incrementing primary key type.
const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version BIGINT PRIMARY KEY,
    applied_at BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id {pk},
    user_name TEXT NOT NULL,
    name TEXT,
    surname TEXT,
    email TEXT NOT NULL,
    is_activated BIGINT NOT NULL DEFAULT 0,
    is_valid BIGINT NOT NULL DEFAULT 1,
    is_locked BIGINT NOT NULL DEFAULT 0,
    failed_attempts BIGINT NOT NULL DEFAULT 0,
    first_failed_at BIGINT,
    last_failed_at BIGINT,
    password_changed_at BIGINT,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL,
    activated_at BIGINT,
    last_connect_at BIGINT,
    last_connect_ip TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_user_name ON accounts (LOWER(user_name));
CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_email ON accounts (LOWER(email));

CREATE TABLE IF NOT EXISTS credentials (
    id {pk},
    account_id BIGINT NOT NULL REFERENCES accounts (id),
    hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    valid_from BIGINT NOT NULL,
    valid_until BIGINT,
    is_temporary BIGINT NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_credentials_account ON credentials (account_id, valid_from);

CREATE TABLE IF NOT EXISTS roles (
    id {pk},
    name TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_roles_name ON roles (LOWER(name));

CREATE TABLE IF NOT EXISTS account_roles (
    account_id BIGINT NOT NULL REFERENCES accounts (id),
    role_id BIGINT NOT NULL REFERENCES roles (id),
    valid_from BIGINT NOT NULL,
    valid_until BIGINT,
    PRIMARY KEY (account_id, role_id, valid_from)
);

CREATE TABLE IF NOT EXISTS account_role_history (
    account_id BIGINT NOT NULL,
    role_id BIGINT NOT NULL,
    valid_from BIGINT NOT NULL,
    valid_until BIGINT NOT NULL,
    archived_at BIGINT NOT NULL,
    PRIMARY KEY (account_id, role_id, valid_from)
);

CREATE TABLE IF NOT EXISTS policy_parameters (
    param_group TEXT NOT NULL,
    param_key TEXT NOT NULL,
    param_value TEXT,
    PRIMARY KEY (param_group, param_key)
);

CREATE TABLE IF NOT EXISTS signing_keys (
    id {pk},
    key_material TEXT NOT NULL,
    valid_from BIGINT NOT NULL,
    valid_until BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_signing_keys_validity ON signing_keys (valid_from, valid_until);

CREATE TABLE IF NOT EXISTS account_ips (
    account_id BIGINT NOT NULL REFERENCES accounts (id),
    ip TEXT NOT NULL,
    PRIMARY KEY (account_id, ip)
);

CREATE TABLE IF NOT EXISTS audit_log (
    id {pk},
    logged_at BIGINT NOT NULL,
    category TEXT NOT NULL,
    status TEXT NOT NULL,
    message TEXT NOT NULL,
    error TEXT,
    details TEXT
);

CREATE INDEX IF NOT EXISTS idx_audit_log_time ON audit_log (logged_at);
"#;

/// The schema DDL for a dialect, split into individual statements.
pub fn schema_statements(dialect: Dialect) -> Vec<String> {
    CREATE_SCHEMA
        .replace("{pk}", dialect.primary_key())
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run all pending migrations.
///
/// Creation is idempotent; the applied version is recorded once in
/// `schema_migrations`.
pub async fn run_migrations(store: &dyn Store, dialect: Dialect) -> AppResult<()> {
    info!("Running database migrations...");

    let mut uow = store.begin().await?;
    for statement in schema_statements(dialect) {
        uow.execute(&statement, &[]).await?;
    }

    let applied = uow
        .fetch_one(
            "SELECT COUNT(*) AS n FROM schema_migrations WHERE version = ?",
            &[SqlValue::Int(SCHEMA_VERSION)],
        )
        .await?
        .i64("n")?;

    if applied == 0 {
        let now = chrono::Utc::now().timestamp_micros();
        uow.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)",
            &[SqlValue::Int(SCHEMA_VERSION), SqlValue::Int(now)],
        )
        .await?;
    }
    uow.commit().await?;

    info!(version = SCHEMA_VERSION, "Database migrations completed successfully");
    Ok(())
}

/// The newest applied schema version, or `None` before the first
/// migration.
pub async fn applied_version(store: &dyn Store) -> AppResult<Option<i64>> {
    let mut conn = store.connection().await?;
    match conn
        .fetch_optional("SELECT MAX(version) AS v FROM schema_migrations", &[])
        .await
    {
        Ok(row) => Ok(row.and_then(|r| r.opt_i64("v").ok().flatten())),
        Err(e) if e.is(ErrorKind::Database) => {
            debug!(error = %e, "Schema version table not readable");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
