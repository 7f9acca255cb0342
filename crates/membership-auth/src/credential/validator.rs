//! Credential validation: storing new passwords and verifying logins.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use membership_core::audit::{AuditCategory, AuditEvent};
use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, Clock, SqlExecutor, Store};
use membership_database::repositories::{
    AccountIpRepository, AccountRepository, CredentialRepository,
};

use super::outcome::{LoginFailure, LoginOutcome, PasswordOutcome};
use crate::lockout::LockoutTracker;
use crate::password::{PasswordHasher, PasswordValidator, PolicyViolation};
use crate::policy::PasswordRules;

/// Enforces password rules on write and verifies credentials on read.
#[derive(Debug, Clone)]
pub struct CredentialValidator {
    store: Arc<dyn Store>,
    hasher: Arc<PasswordHasher>,
    rules: PasswordValidator,
    lockout: Arc<LockoutTracker>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl CredentialValidator {
    /// Creates a new credential validator.
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<PasswordHasher>,
        lockout: Arc<LockoutTracker>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            hasher,
            rules: PasswordValidator::new(),
            lockout,
            audit,
            clock,
        }
    }

    /// The clock this validator stamps credentials with.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Validate a new password and, if it passes, make it the account's
    /// current credential in one unit of work.
    pub async fn validate_and_store(
        &self,
        account_id: i64,
        password: &str,
        rules: &PasswordRules,
        temporary: bool,
    ) -> AppResult<PasswordOutcome> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let outcome = self
            .validate_and_store_in(&mut *uow, account_id, password, rules, temporary, now)
            .await?;

        match &outcome {
            PasswordOutcome::Stored { .. } => uow.commit().await?,
            PasswordOutcome::Rejected(_) => uow.rollback().await?,
        }

        self.audit_password_outcome(account_id, &outcome, temporary).await;
        Ok(outcome)
    }

    /// The same as [`Self::validate_and_store`], on a unit of work owned by
    /// the caller. Nothing is committed or audited; a rejection writes
    /// nothing.
    pub async fn validate_and_store_in<E>(
        &self,
        db: &mut E,
        account_id: i64,
        password: &str,
        rules: &PasswordRules,
        temporary: bool,
        now: DateTime<Utc>,
    ) -> AppResult<PasswordOutcome>
    where
        E: SqlExecutor + ?Sized,
    {
        let account = AccountRepository::find_by_id(db, account_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))?;

        if let Err(violation) = self.rules.check_quality(password, rules) {
            return Ok(PasswordOutcome::Rejected(violation));
        }

        if rules.not_repeat_last > 0 {
            let recent = CredentialRepository::find_recent(db, account_id, rules.not_repeat_last).await?;
            for previous in &recent {
                if self.hasher.verify(password, &previous.salt, &previous.hash)? {
                    return Ok(PasswordOutcome::Rejected(PolicyViolation::RecentlyUsed(
                        rules.not_repeat_last,
                    )));
                }
            }
        }

        if let Err(violation) = self.rules.check_username(password, &account.username, rules) {
            return Ok(PasswordOutcome::Rejected(violation));
        }

        let salt = self.hasher.generate_salt()?;
        let hash = self.hasher.hash(password, &salt)?;
        let valid_until =
            (rules.change_interval_days > 0).then(|| now + Duration::days(rules.change_interval_days));

        CredentialRepository::close_open(db, account_id, now).await?;
        let credential_id =
            CredentialRepository::insert(db, account_id, &hash, &salt, now, valid_until, temporary)
                .await?;
        AccountRepository::set_password_changed(db, account_id, now).await?;

        debug!(account_id, credential_id, temporary, "Credential stored");
        Ok(PasswordOutcome::Stored { credential_id })
    }

    /// Emit the audit entry for a password change attempt.
    pub async fn audit_password_outcome(
        &self,
        account_id: i64,
        outcome: &PasswordOutcome,
        temporary: bool,
    ) {
        let event = match outcome {
            PasswordOutcome::Stored { .. } => {
                info!(account_id, temporary, "Password changed");
                AuditEvent::success(AuditCategory::PasswordChange, "Password changed")
            }
            PasswordOutcome::Rejected(violation) => AuditEvent::failure(
                AuditCategory::PasswordChange,
                "Password rejected",
                violation.to_string(),
            ),
        };
        self.audit
            .emit(
                event
                    .with_detail("account_id", account_id)
                    .with_detail("temporary", temporary),
            )
            .await;
    }

    /// Check a username and password presented from `client_ip`.
    ///
    /// A wrong password is counted by the lockout tracker. Every outcome is
    /// audited.
    pub async fn verify_login(
        &self,
        username: &str,
        password: &str,
        client_ip: &str,
    ) -> AppResult<LoginOutcome> {
        let now = self.clock.now();

        let (account, credential) = {
            let mut conn = self.store.connection().await?;

            let Some(account) = AccountRepository::find_by_username(&mut *conn, username).await?
            else {
                drop(conn);
                return Ok(self.fail(username, None, LoginFailure::UnknownUser).await);
            };

            let credential = CredentialRepository::find_valid(&mut *conn, account.id, now).await?;

            let failure = if account.is_locked {
                Some(LoginFailure::Locked)
            } else if !account.is_activated {
                Some(LoginFailure::NotActivated)
            } else if !account.is_valid {
                Some(LoginFailure::Invalid)
            } else if credential.is_none() {
                Some(LoginFailure::NoValidCredential)
            } else {
                let allowed = AccountIpRepository::find_by_account(&mut *conn, account.id).await?;
                (!allowed.is_empty() && !allowed.iter().any(|a| a.ip == client_ip))
                    .then_some(LoginFailure::IpNotAllowed)
            };

            drop(conn);
            match (failure, credential) {
                (None, Some(credential)) => (account, credential),
                (Some(failure), _) => return Ok(self.fail(username, Some(account.id), failure).await),
                (None, None) => {
                    return Ok(self
                        .fail(username, Some(account.id), LoginFailure::NoValidCredential)
                        .await);
                }
            }
        };

        if !self
            .hasher
            .verify(password, &credential.salt, &credential.hash)?
        {
            self.lockout.record_failure(account.id, &account.username).await;
            return Ok(self
                .fail(username, Some(account.id), LoginFailure::WrongPassword)
                .await);
        }

        self.audit
            .emit(
                AuditEvent::success(AuditCategory::Login, "Password validated")
                    .with_detail("account_id", account.id)
                    .with_detail("username", account.username.as_str())
                    .with_detail("ip", client_ip)
                    .with_detail("temporary", credential.is_temporary),
            )
            .await;

        Ok(if credential.is_temporary {
            LoginOutcome::TemporaryPassword(account)
        } else {
            LoginOutcome::Ok(account)
        })
    }

    async fn fail(&self, username: &str, account_id: Option<i64>, reason: LoginFailure) -> LoginOutcome {
        debug!(username = %username, reason = %reason, "Login refused");
        let mut event = AuditEvent::failure(AuditCategory::Login, "Login refused", reason.to_string())
            .with_detail("username", username);
        if let Some(id) = account_id {
            event = event.with_detail("account_id", id);
        }
        self.audit.emit(event).await;
        LoginOutcome::Failed(reason)
    }
}
