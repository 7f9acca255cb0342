//! Account management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use membership_auth::{LockoutState, PasswordOutcome};
use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_service::MembershipEngine;
use membership_service::account::{LoginResponse, RegisterRequest, RegisterResponse};

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List all accounts
    List,
    /// Show one account with its lock state, roles, and allowed IPs
    Show {
        /// Username
        username: String,
    },
    /// Register a new account
    Register {
        /// Username
        username: String,
        /// Email
        #[arg(short, long)]
        email: String,
        /// Given name
        #[arg(long, default_value = "")]
        name: String,
        /// Family name
        #[arg(long, default_value = "")]
        surname: String,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Activate an account
    Activate {
        /// Username
        username: String,
    },
    /// Check credentials and print a session token
    Login {
        /// Username
        username: String,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
        /// Source address to check against the allow-list
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,
    },
    /// Lift a lock and clear the failure counter
    Unlock {
        /// Username
        username: String,
    },
    /// Set a temporary password and lift any lock
    ResetPassword {
        /// Username
        username: String,
        /// Temporary password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Restrict logins to an additional source address
    AllowIp {
        /// Username
        username: String,
        /// IP address
        ip: String,
    },
    /// Remove a source address from the allow-list
    DisallowIp {
        /// Username
        username: String,
        /// IP address
        ip: String,
    },
}

/// Account display row for table output
#[derive(Debug, Serialize, Tabled)]
struct AccountRow {
    /// Account ID
    id: i64,
    /// Username
    username: String,
    /// Full name
    name: String,
    /// Email
    email: String,
    /// Activated
    activated: String,
    /// Locked
    locked: String,
    /// Last login
    last_connect: String,
}

#[derive(Debug, Serialize)]
struct AccountDetail {
    account: membership_entity::account::Account,
    lockout: LockoutState,
    roles: Vec<String>,
    allowed_ips: Vec<String>,
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    engine: &MembershipEngine,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        UserCommand::List => {
            let rows: Vec<AccountRow> = engine
                .admin
                .list_accounts()
                .await?
                .into_iter()
                .map(|a| AccountRow {
                    id: a.id,
                    name: a.display_name(),
                    username: a.username,
                    email: a.email,
                    activated: output::yes_no(a.is_activated),
                    locked: output::yes_no(a.is_locked),
                    last_connect: output::opt_time(a.last_connect_at),
                })
                .collect();
            output::print_list(&rows, format);
        }
        UserCommand::Show { username } => {
            let account = engine.admin.find_account(username).await?;
            let lockout = engine.admin.lockout_status(account.id).await?;
            let roles = engine
                .roles
                .effective_roles(account.id, None)
                .await?
                .into_iter()
                .collect();
            let allowed_ips = engine
                .admin
                .allowed_ips(account.id)
                .await?
                .into_iter()
                .map(|entry| entry.ip)
                .collect();
            let detail = AccountDetail {
                account,
                lockout,
                roles,
                allowed_ips,
            };
            match format {
                OutputFormat::Json => output::print_json(&detail),
                OutputFormat::Table => print_detail(&detail),
            }
        }
        UserCommand::Register {
            username,
            email,
            name,
            surname,
            password,
        } => {
            let password = super::password_or_prompt(password, "Password")?;
            let request = RegisterRequest {
                username: username.clone(),
                confirm_password: password.clone(),
                password,
                name: name.clone(),
                surname: surname.clone(),
                email: email.clone(),
            };
            match engine.accounts.register(request).await? {
                RegisterResponse::Registered { account_id } => output::print_success(&format!(
                    "User '{username}' registered (id: {account_id})"
                )),
                RegisterResponse::Rejected(violation) => {
                    return Err(AppError::validation(violation.to_string()));
                }
            }
        }
        UserCommand::Activate { username } => {
            let account = engine.admin.find_account(username).await?;
            if engine.accounts.activate(account.id).await? {
                output::print_success(&format!("User '{username}' activated"));
            } else {
                output::print_warning(&format!("User '{username}' was already activated"));
            }
        }
        UserCommand::Login {
            username,
            password,
            ip,
        } => {
            let password = match password {
                Some(p) => p.clone(),
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?,
            };
            match engine.accounts.login(username, &password, ip).await? {
                LoginResponse::Success { session, token } => {
                    if session.temporary_password {
                        output::print_warning("Temporary password: a change is required.");
                    }
                    match format {
                        OutputFormat::Json => output::print_json(&serde_json::json!({
                            "session": session,
                            "token": token,
                        })),
                        OutputFormat::Table => {
                            output::print_kv("Session", &session.session_id);
                            output::print_kv("Token", &token);
                        }
                    }
                }
                LoginResponse::Failure { message } => {
                    return Err(AppError::authentication(message));
                }
            }
        }
        UserCommand::Unlock { username } => {
            let account = engine.admin.find_account(username).await?;
            engine.admin.unlock(account.id).await?;
            output::print_success(&format!("User '{username}' unlocked"));
        }
        UserCommand::ResetPassword { username, password } => {
            let account = engine.admin.find_account(username).await?;
            let password = super::password_or_prompt(password, "Temporary password")?;
            match engine.admin.reset_password(account.id, &password).await? {
                PasswordOutcome::Stored { .. } => output::print_success(&format!(
                    "Temporary password set for '{username}'"
                )),
                PasswordOutcome::Rejected(violation) => {
                    return Err(AppError::validation(violation.to_string()));
                }
            }
        }
        UserCommand::AllowIp { username, ip } => {
            let account = engine.admin.find_account(username).await?;
            if engine.admin.allow_ip(account.id, ip).await? {
                output::print_success(&format!("'{username}' may log in from {ip}"));
            } else {
                output::print_warning(&format!("{ip} was already allowed for '{username}'"));
            }
        }
        UserCommand::DisallowIp { username, ip } => {
            let account = engine.admin.find_account(username).await?;
            if engine.admin.disallow_ip(account.id, ip).await? {
                output::print_success(&format!("{ip} removed for '{username}'"));
            } else {
                output::print_warning(&format!("{ip} was not allowed for '{username}'"));
            }
        }
    }

    Ok(())
}

fn print_detail(detail: &AccountDetail) {
    let a = &detail.account;
    output::print_kv("ID", &a.id.to_string());
    output::print_kv("Username", &a.username);
    output::print_kv("Name", &a.display_name());
    output::print_kv("Email", &a.email);
    output::print_kv("Activated", &output::opt_time(a.activated_at));
    output::print_kv("Valid", &output::yes_no(a.is_valid));
    output::print_kv("Password changed", &output::opt_time(a.password_changed_at));
    output::print_kv("Last connect", &output::opt_time(a.last_connect_at));
    output::print_kv("Last IP", a.last_connect_ip.as_deref().unwrap_or("-"));

    let lockout = match detail.lockout {
        LockoutState::Clear => "clear".to_string(),
        LockoutState::Accumulating {
            failed_attempts, ..
        } => format!("{failed_attempts} failed attempt(s)"),
        LockoutState::Locked => "locked".to_string(),
    };
    output::print_kv("Lockout", &lockout);
    output::print_kv("Roles", &join_or_dash(&detail.roles));
    output::print_kv("Allowed IPs", &join_or_dash(&detail.allowed_ips));
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
