//! Audit log CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use membership_core::result::AppResult;
use membership_core::traits::Store;
use membership_database::SqlStore;
use membership_database::repositories::AuditLogRepository;

use crate::output::{self, OutputFormat};

/// Arguments for audit commands
#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Audit subcommand
    #[command(subcommand)]
    pub command: AuditCommand,
}

/// Audit subcommands
#[derive(Debug, Subcommand)]
pub enum AuditCommand {
    /// Show the most recent entries
    Recent {
        /// Filter by category, e.g. login or lockout
        #[arg(short, long)]
        category: Option<String>,
        /// Number of results
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
}

/// Audit entry display row for table output
#[derive(Debug, Serialize, Tabled)]
struct AuditRow {
    /// Entry ID
    id: i64,
    /// Time
    time: String,
    /// Category
    category: String,
    /// Status
    status: String,
    /// Message
    message: String,
    /// Error
    error: String,
}

/// Execute audit commands
pub async fn execute(args: &AuditArgs, store: &SqlStore, format: OutputFormat) -> AppResult<()> {
    match &args.command {
        AuditCommand::Recent { category, limit } => {
            let entries = {
                let mut conn = store.connection().await?;
                AuditLogRepository::find_recent(&mut *conn, category.as_deref(), *limit).await?
            };
            match format {
                OutputFormat::Json => output::print_json(&entries),
                OutputFormat::Table => {
                    let rows: Vec<AuditRow> = entries
                        .into_iter()
                        .map(|e| AuditRow {
                            id: e.id,
                            time: output::time(e.logged_at),
                            category: e.category,
                            status: e.status,
                            message: e.message,
                            error: e.error.unwrap_or_default(),
                        })
                        .collect();
                    output::print_list(&rows, format);
                }
            }
        }
    }

    Ok(())
}
