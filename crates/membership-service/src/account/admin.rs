//! Administrative account operations.

use std::sync::Arc;

use tracing::info;

use membership_auth::{
    CredentialValidator, LockoutState, LockoutTracker, PasswordOutcome, PolicyStore,
};
use membership_core::audit::{AuditCategory, AuditEvent};
use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, SqlExecutor, Store};
use membership_database::repositories::{AccountIpRepository, AccountRepository};
use membership_entity::account::{Account, AccountIp};

/// Account operations reserved for administrators.
#[derive(Debug, Clone)]
pub struct AdminAccountService {
    store: Arc<dyn Store>,
    policy: Arc<PolicyStore>,
    policy_group: String,
    credentials: Arc<CredentialValidator>,
    lockout: Arc<LockoutTracker>,
    audit: Arc<dyn AuditSink>,
}

impl AdminAccountService {
    /// Creates a new admin account service.
    pub fn new(
        store: Arc<dyn Store>,
        policy: Arc<PolicyStore>,
        policy_group: impl Into<String>,
        credentials: Arc<CredentialValidator>,
        lockout: Arc<LockoutTracker>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            policy,
            policy_group: policy_group.into(),
            credentials,
            lockout,
            audit,
        }
    }

    /// List all accounts ordered by username.
    pub async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        let mut conn = self.store.connection().await?;
        AccountRepository::find_all(&mut *conn).await
    }

    /// Look up an account by username.
    pub async fn find_account(&self, username: &str) -> AppResult<Account> {
        let mut conn = self.store.connection().await?;
        AccountRepository::find_by_username(&mut *conn, username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))
    }

    /// Give the account a temporary password and lift any lock.
    ///
    /// The holder has to change the password at the next login. The new
    /// credential and the unlock commit together; a temporary password that
    /// breaks a rule changes nothing.
    pub async fn reset_password(
        &self,
        account_id: i64,
        temporary_password: &str,
    ) -> AppResult<PasswordOutcome> {
        let rules = self.policy.password_rules(&self.policy_group).await?;
        let now = self.credentials.clock().now();

        let outcome = {
            let _lock = self.lockout.lock_account(account_id).await;
            let mut uow = self.store.begin().await?;
            let outcome = self
                .credentials
                .validate_and_store_in(&mut *uow, account_id, temporary_password, &rules, true, now)
                .await?;

            match &outcome {
                PasswordOutcome::Stored { .. } => {
                    AccountRepository::unlock(&mut *uow, account_id, now).await?;
                    uow.commit().await?;
                }
                PasswordOutcome::Rejected(_) => uow.rollback().await?,
            }
            outcome
        };

        self.credentials
            .audit_password_outcome(account_id, &outcome, true)
            .await;
        if outcome.is_stored() {
            self.lockout.audit_unlock(account_id).await;
            info!(account_id, "Password reset");
        }
        Ok(outcome)
    }

    /// Lift a lock and clear the failure counter.
    pub async fn unlock(&self, account_id: i64) -> AppResult<()> {
        self.lockout.unlock(account_id).await
    }

    /// Current lockout state of an account.
    pub async fn lockout_status(&self, account_id: i64) -> AppResult<LockoutState> {
        self.lockout.status(account_id).await
    }

    /// Source addresses the account may log in from. Empty means any.
    pub async fn allowed_ips(&self, account_id: i64) -> AppResult<Vec<AccountIp>> {
        let mut conn = self.store.connection().await?;
        AccountIpRepository::find_by_account(&mut *conn, account_id).await
    }

    /// Add `ip` to the account's allow-list. Returns `false` if it was
    /// already there.
    pub async fn allow_ip(&self, account_id: i64, ip: &str) -> AppResult<bool> {
        let ip = ip.trim();
        if ip.is_empty() {
            return Err(AppError::validation("IP address is required"));
        }

        let added = {
            let mut conn = self.store.connection().await?;
            self.require_account(&mut *conn, account_id).await?;
            AccountIpRepository::insert(&mut *conn, account_id, ip).await? > 0
        };

        if added {
            info!(account_id, ip = %ip, "IP address allowed");
            self.audit
                .emit(
                    AuditEvent::success(AuditCategory::IpAllowList, "IP address allowed")
                        .with_detail("account_id", account_id)
                        .with_detail("ip", ip),
                )
                .await;
        }
        Ok(added)
    }

    /// Remove `ip` from the account's allow-list. Returns `false` if it was
    /// not there.
    pub async fn disallow_ip(&self, account_id: i64, ip: &str) -> AppResult<bool> {
        let ip = ip.trim();
        let removed = {
            let mut conn = self.store.connection().await?;
            self.require_account(&mut *conn, account_id).await?;
            AccountIpRepository::delete(&mut *conn, account_id, ip).await? > 0
        };

        if removed {
            info!(account_id, ip = %ip, "IP address disallowed");
            self.audit
                .emit(
                    AuditEvent::success(AuditCategory::IpAllowList, "IP address disallowed")
                        .with_detail("account_id", account_id)
                        .with_detail("ip", ip),
                )
                .await;
        }
        Ok(removed)
    }

    async fn require_account<E>(&self, conn: &mut E, account_id: i64) -> AppResult<()>
    where
        E: SqlExecutor + ?Sized,
    {
        AccountRepository::find_by_id(conn, account_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))
    }
}
