//! Schema management commands.

use clap::{Args, Subcommand};

use membership_core::result::AppResult;
use membership_database::SqlStore;
use membership_database::migration::{self, SCHEMA_VERSION};

use crate::output::{self, OutputFormat};

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Create or update the schema
    Run,
    /// Show the applied schema version
    Status,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, store: &SqlStore, format: OutputFormat) -> AppResult<()> {
    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            migration::run_migrations(store, store.dialect()).await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Status => {
            let healthy = store.health_check().await?;
            let applied = migration::applied_version(store).await?;
            let status = serde_json::json!({
                "dialect": format!("{:?}", store.dialect()),
                "healthy": healthy,
                "applied_version": applied,
                "latest_version": SCHEMA_VERSION,
            });
            match format {
                OutputFormat::Json => output::print_json(&status),
                OutputFormat::Table => {
                    output::print_kv("Dialect", &format!("{:?}", store.dialect()));
                    output::print_kv("Healthy", &output::yes_no(healthy));
                    output::print_kv(
                        "Applied version",
                        &applied.map_or_else(|| "none".to_string(), |v| v.to_string()),
                    );
                    output::print_kv("Latest version", &SCHEMA_VERSION.to_string());
                    if applied != Some(SCHEMA_VERSION) {
                        output::print_warning("Schema is not up to date; run `migrate run`.");
                    }
                }
            }
        }
    }
    Ok(())
}
