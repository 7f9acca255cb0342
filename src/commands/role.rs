//! Role management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use membership_core::result::AppResult;
use membership_service::MembershipEngine;

use crate::output::{self, OutputFormat};

/// Arguments for role commands
#[derive(Debug, Args)]
pub struct RoleArgs {
    /// Role subcommand
    #[command(subcommand)]
    pub command: RoleCommand,
}

/// Role subcommands
#[derive(Debug, Subcommand)]
pub enum RoleCommand {
    /// List all roles
    List,
    /// Create a role if it does not exist
    Create {
        /// Role name
        name: String,
    },
    /// Rename a role
    Rename {
        /// Current name
        name: String,
        /// New name
        new_name: String,
    },
    /// Give a user a role
    Assign {
        /// Username
        username: String,
        /// Role name
        role: String,
        /// Start of the membership, RFC 3339 (default: now)
        #[arg(long)]
        from: Option<String>,
    },
    /// Take a role away from a user
    Revoke {
        /// Username
        username: String,
        /// Role name
        role: String,
        /// End of the membership, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Show the roles a user holds
    Of {
        /// Username
        username: String,
        /// Point in time, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },
}

/// Role display row for table output
#[derive(Debug, Serialize, Tabled)]
struct RoleRow {
    /// Role ID
    id: i64,
    /// Name
    name: String,
}

/// Execute role commands
pub async fn execute(
    args: &RoleArgs,
    engine: &MembershipEngine,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        RoleCommand::List => {
            let rows: Vec<RoleRow> = engine
                .roles
                .list_roles()
                .await?
                .into_iter()
                .map(|r| RoleRow {
                    id: r.id,
                    name: r.name,
                })
                .collect();
            output::print_list(&rows, format);
        }
        RoleCommand::Create { name } => {
            let id = engine.roles.ensure_role(name).await?;
            output::print_success(&format!("Role '{name}' (id: {id})"));
        }
        RoleCommand::Rename { name, new_name } => {
            let role = engine.roles.find_role(name).await?;
            engine.roles.rename_role(role.id, new_name).await?;
            output::print_success(&format!("Role '{name}' renamed to '{new_name}'"));
        }
        RoleCommand::Assign {
            username,
            role,
            from,
        } => {
            let account = engine.admin.find_account(username).await?;
            let from = from.as_deref().map(super::parse_time).transpose()?;
            if engine.roles.assign(account.id, role, from).await? {
                output::print_success(&format!("'{username}' is now in role '{role}'"));
            } else {
                output::print_warning(&format!("'{username}' already holds role '{role}'"));
            }
        }
        RoleCommand::Revoke { username, role, at } => {
            let account = engine.admin.find_account(username).await?;
            let at = at.as_deref().map(super::parse_time).transpose()?;
            if engine.roles.revoke(account.id, role, at).await? {
                output::print_success(&format!("Role '{role}' revoked from '{username}'"));
            } else {
                output::print_warning(&format!("'{username}' does not hold role '{role}'"));
            }
        }
        RoleCommand::Of { username, at } => {
            let account = engine.admin.find_account(username).await?;
            let at = at.as_deref().map(super::parse_time).transpose()?;
            let roles: Vec<String> = engine
                .roles
                .effective_roles(account.id, at)
                .await?
                .into_iter()
                .collect();
            match format {
                OutputFormat::Json => output::print_json(&roles),
                OutputFormat::Table if roles.is_empty() => println!("No roles."),
                OutputFormat::Table => roles.iter().for_each(|r| println!("  {r}")),
            }
        }
    }

    Ok(())
}
