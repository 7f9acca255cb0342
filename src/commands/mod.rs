//! CLI command definitions and dispatch.

pub mod audit;
pub mod keys;
pub mod migrate;
pub mod policy;
pub mod role;
pub mod user;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use membership_core::config::AppConfig;
use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, Clock, Store, SystemClock};
use membership_database::{DatabaseAuditSink, SqlStore};
use membership_service::MembershipEngine;

use crate::output::{self, OutputFormat};

/// Membership engine administration
#[derive(Debug, Parser)]
#[command(name = "membership", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Store URL, overriding the configuration
    #[arg(long)]
    pub database_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Schema management
    Migrate(migrate::MigrateArgs),
    /// Insert the default password rules and roles
    Seed,
    /// Account management
    User(user::UserArgs),
    /// Role management
    Role(role::RoleArgs),
    /// Session signing keys
    Keys(keys::KeysArgs),
    /// Password rules
    Policy(policy::PolicyArgs),
    /// Audit log
    Audit(audit::AuditArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        let store = connect(&config).await?;

        let result = match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &store, self.format).await,
            Commands::Seed => {
                membership_database::seed::seed_defaults(store.as_ref()).await?;
                output::print_success("Default password rules and roles are in place.");
                Ok(())
            }
            Commands::User(args) => {
                user::execute(args, &build_engine(&config, &store)?, self.format).await
            }
            Commands::Role(args) => {
                role::execute(args, &build_engine(&config, &store)?, self.format).await
            }
            Commands::Keys(args) => {
                keys::execute(args, &build_engine(&config, &store)?, self.format).await
            }
            Commands::Policy(args) => policy::execute(args, &config, &store, self.format).await,
            Commands::Audit(args) => audit::execute(args, &store, self.format).await,
        };

        store.close().await;
        result
    }
}

/// Helper: open the configured store
///
/// An in-memory store starts empty, so it is migrated and seeded first.
pub async fn connect(config: &AppConfig) -> AppResult<Arc<SqlStore>> {
    let store = Arc::new(SqlStore::connect(&config.database).await?);
    if config.database.is_in_memory() {
        membership_database::migration::run_migrations(store.as_ref(), store.dialect()).await?;
        membership_database::seed::seed_defaults(store.as_ref()).await?;
    }
    Ok(store)
}

/// Helper: wire the engine over `store`, auditing into the store itself
pub fn build_engine(config: &AppConfig, store: &Arc<SqlStore>) -> AppResult<MembershipEngine> {
    let store: Arc<dyn Store> = store.clone();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let audit: Arc<dyn AuditSink> =
        Arc::new(DatabaseAuditSink::new(Arc::clone(&store), Arc::clone(&clock)));
    MembershipEngine::new(store, audit, clock, config)
}

/// Helper: parse an RFC 3339 timestamp argument
pub fn parse_time(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| AppError::validation(format!("Invalid timestamp '{raw}': {e}")))
}

/// Helper: take a password from the argument or prompt for it
pub fn password_or_prompt(password: &Option<String>, prompt: &str) -> AppResult<String> {
    match password {
        Some(p) => Ok(p.clone()),
        None => dialoguer::Password::new()
            .with_prompt(prompt)
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}"))),
    }
}
