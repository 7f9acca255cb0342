//! Password rule CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use membership_core::config::AppConfig;
use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::traits::Store;
use membership_database::SqlStore;
use membership_database::repositories::PolicyRepository;
use membership_entity::policy::keys::PASSWORD_RULE_DEFAULTS;

use crate::output::{self, OutputFormat};

/// Arguments for policy commands
#[derive(Debug, Args)]
pub struct PolicyArgs {
    /// Policy subcommand
    #[command(subcommand)]
    pub command: PolicyCommand,
}

/// Policy subcommands
#[derive(Debug, Subcommand)]
pub enum PolicyCommand {
    /// Show every parameter of a group
    Show {
        /// Parameter group (default: from configuration)
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Set one parameter
    Set {
        /// Parameter key, e.g. min-characters
        key: String,
        /// New value
        value: String,
        /// Parameter group (default: from configuration)
        #[arg(short, long)]
        group: Option<String>,
    },
}

/// Parameter display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ParameterRow {
    /// Key
    key: String,
    /// Value
    value: String,
}

/// Execute policy commands
pub async fn execute(
    args: &PolicyArgs,
    config: &AppConfig,
    store: &SqlStore,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        PolicyCommand::Show { group } => {
            let group = group.as_deref().unwrap_or(&config.auth.policy_group);
            let mut conn = store.connection().await?;
            let rows: Vec<ParameterRow> = PolicyRepository::find_group(&mut *conn, group)
                .await?
                .into_iter()
                .map(|p| ParameterRow {
                    key: p.key,
                    value: p.value,
                })
                .collect();
            output::print_list(&rows, format);
        }
        PolicyCommand::Set { key, value, group } => {
            let group = group.as_deref().unwrap_or(&config.auth.policy_group);
            let known = PASSWORD_RULE_DEFAULTS.iter().any(|(k, _)| *k == key.as_str());
            if group == config.auth.policy_group && !known {
                return Err(AppError::validation(format!(
                    "Unknown password rule '{key}'"
                )));
            }
            if value.trim().parse::<i64>().is_err() {
                output::print_warning(&format!("'{value}' is not an integer and will read as 0"));
            }

            let mut conn = store.connection().await?;
            PolicyRepository::upsert(&mut *conn, group, key, value.trim()).await?;
            output::print_success(&format!("{group}/{key} = {}", value.trim()));
        }
    }

    Ok(())
}
