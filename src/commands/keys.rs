//! Session signing key CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use membership_core::result::AppResult;
use membership_database::repositories::SigningKeyRepository;
use membership_service::MembershipEngine;

use crate::output::{self, OutputFormat};

/// Arguments for key commands
#[derive(Debug, Args)]
pub struct KeysArgs {
    /// Key subcommand
    #[command(subcommand)]
    pub command: KeysCommand,
}

/// Key subcommands
#[derive(Debug, Subcommand)]
pub enum KeysCommand {
    /// List all signing keys, newest first
    List,
    /// Generate fresh signing keys; existing keys stay valid
    Rotate {
        /// Number of keys to generate (default: from configuration)
        #[arg(short, long)]
        count: Option<usize>,
    },
}

/// Key display row for table output. Key material is never shown.
#[derive(Debug, Serialize, Tabled)]
struct KeyRow {
    /// Key ID
    id: i64,
    /// Valid from
    valid_from: String,
    /// Valid until
    valid_until: String,
    /// Usable now
    active: String,
}

/// Execute key commands
pub async fn execute(
    args: &KeysArgs,
    engine: &MembershipEngine,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        KeysCommand::List => {
            let now = engine.clock.now();
            let keys = {
                let mut conn = engine.store.connection().await?;
                SigningKeyRepository::find_all(&mut *conn).await?
            };
            let rows: Vec<KeyRow> = keys
                .iter()
                .map(|k| KeyRow {
                    id: k.id,
                    valid_from: output::time(k.valid_from),
                    valid_until: output::time(k.valid_until),
                    active: output::yes_no(k.is_valid_at(now)),
                })
                .collect();
            output::print_list(&rows, format);
        }
        KeysCommand::Rotate { count } => {
            let count = count.unwrap_or(engine.sessions.config().keys_per_rotation);
            let ids = engine.sessions.rotate_keys(count).await?;
            output::print_success(&format!("Generated {} signing key(s): {ids:?}", ids.len()));
        }
    }

    Ok(())
}
