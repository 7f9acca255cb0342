//! Sliding-window failure counter.
//!
//! Each failed password check either starts a new window (counter = 1) or
//! extends the current one. Reaching `max-allowed-failed-atmpts` within the
//! window locks the account and force-closes its open credential. Updates
//! for one account are serialized; different accounts proceed in parallel.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use membership_core::audit::{AuditCategory, AuditEvent};
use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, Clock, Store};
use membership_database::repositories::{AccountRepository, CredentialRepository};
use membership_entity::account::FailureWindow;

use crate::policy::{PasswordRules, PolicyStore};

/// Lockout state of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockoutState {
    /// No failures in the current window.
    Clear,
    /// Failures counted but below the threshold.
    Accumulating {
        /// Failures in the current window.
        failed_attempts: i64,
        /// Start of the current window.
        first_failed_at: Option<DateTime<Utc>>,
    },
    /// Locked; only an administrative unlock clears it.
    Locked,
}

/// Counts failures per account and locks accounts that exceed the limit.
pub struct LockoutTracker {
    store: Arc<dyn Store>,
    policy: Arc<PolicyStore>,
    policy_group: String,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    /// One critical section per account.
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for LockoutTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockoutTracker")
            .field("policy_group", &self.policy_group)
            .field("tracked_accounts", &self.tracked_accounts())
            .finish()
    }
}

impl LockoutTracker {
    /// Create a tracker reading its thresholds from `policy_group`.
    pub fn new(
        store: Arc<dyn Store>,
        policy: Arc<PolicyStore>,
        policy_group: impl Into<String>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            policy,
            policy_group: policy_group.into(),
            audit,
            clock,
            locks: DashMap::new(),
        }
    }

    /// Enter the account's critical section. Failure counting and unlocking
    /// wait for the returned guard to drop.
    pub async fn lock_account(&self, account_id: i64) -> AccountLock<'_> {
        let mutex = Arc::clone(
            self.locks
                .entry(account_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        AccountLock {
            locks: &self.locks,
            account_id,
            guard: Some(mutex.lock_owned().await),
        }
    }

    /// Accounts with a critical section currently held or awaited.
    pub fn tracked_accounts(&self) -> usize {
        self.locks.len()
    }

    /// Record a failed password check.
    ///
    /// Persistence problems are logged and audited, never returned; `None`
    /// means the failure could not be recorded.
    pub async fn record_failure(&self, account_id: i64, username: &str) -> Option<LockoutState> {
        let rules = match self.policy.password_rules(&self.policy_group).await {
            Ok(rules) => rules,
            Err(e) => {
                self.report_error(account_id, username, "Failed to load lockout rules", &e)
                    .await;
                return None;
            }
        };

        let result = {
            let _lock = self.lock_account(account_id).await;
            self.apply_failure(account_id, &rules).await
        };

        match result {
            Ok((state, locked_now)) => {
                if locked_now {
                    info!(account_id, username = %username, "Account locked after repeated failures");
                    self.audit
                        .emit(
                            AuditEvent::failure(
                                AuditCategory::Lockout,
                                "User locked out",
                                "too many failed attempts",
                            )
                            .with_detail("account_id", account_id)
                            .with_detail("username", username),
                        )
                        .await;
                    self.audit
                        .emit(
                            AuditEvent::success(
                                AuditCategory::Lockout,
                                "User password invalidated for multiple failed attempts",
                            )
                            .with_detail("account_id", account_id)
                            .with_detail("username", username),
                        )
                        .await;
                }
                Some(state)
            }
            Err(e) => {
                self.report_error(account_id, username, "Failed to record failed attempt", &e)
                    .await;
                None
            }
        }
    }

    /// Apply one failure inside a unit of work. Returns the new state and
    /// whether this failure locked the account.
    async fn apply_failure(
        &self,
        account_id: i64,
        rules: &PasswordRules,
    ) -> AppResult<(LockoutState, bool)> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let current = AccountRepository::failure_window(&mut *uow, account_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))?;

        let window_expired = match current.first_failed_at {
            Some(first) => now - first > Duration::minutes(rules.fail_interval_minutes),
            None => true,
        };

        let next = if window_expired {
            FailureWindow {
                failed_attempts: 1,
                first_failed_at: Some(now),
                last_failed_at: Some(now),
                is_locked: current.is_locked,
            }
        } else {
            FailureWindow {
                failed_attempts: current.failed_attempts + 1,
                first_failed_at: current.first_failed_at,
                last_failed_at: Some(now),
                is_locked: current.is_locked,
            }
        };

        AccountRepository::update_failure_window(&mut *uow, account_id, &next, now).await?;

        let reached = rules.lockout_enabled() && next.failed_attempts >= rules.max_failed_attempts;
        let locked_now = reached && !current.is_locked;
        if locked_now {
            AccountRepository::lock(&mut *uow, account_id, now).await?;
            CredentialRepository::close_open(&mut *uow, account_id, now).await?;
        }

        uow.commit().await?;

        let state = if current.is_locked || locked_now {
            LockoutState::Locked
        } else {
            LockoutState::Accumulating {
                failed_attempts: next.failed_attempts,
                first_failed_at: next.first_failed_at,
            }
        };
        Ok((state, locked_now))
    }

    /// Current lockout state of an account.
    ///
    /// A window older than `password-fail-interval` reads as clear.
    pub async fn status(&self, account_id: i64) -> AppResult<LockoutState> {
        let window = {
            let mut conn = self.store.connection().await?;
            AccountRepository::failure_window(&mut *conn, account_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))?
        };

        if window.is_locked {
            return Ok(LockoutState::Locked);
        }
        if window.failed_attempts <= 0 {
            return Ok(LockoutState::Clear);
        }

        let rules = self.policy.password_rules(&self.policy_group).await?;
        let expired = window.first_failed_at.is_none_or(|first| {
            self.clock.now() - first > Duration::minutes(rules.fail_interval_minutes)
        });

        Ok(if expired {
            LockoutState::Clear
        } else {
            LockoutState::Accumulating {
                failed_attempts: window.failed_attempts,
                first_failed_at: window.first_failed_at,
            }
        })
    }

    /// Clear the lock flag and the failure counters.
    ///
    /// Credentials closed by the lock stay closed; issue a new password to
    /// let the account log in again.
    pub async fn unlock(&self, account_id: i64) -> AppResult<()> {
        let affected = {
            let _lock = self.lock_account(account_id).await;

            let mut uow = self.store.begin().await?;
            let affected = AccountRepository::unlock(&mut *uow, account_id, self.clock.now()).await?;
            uow.commit().await?;
            affected
        };

        if affected == 0 {
            return Err(AppError::not_found(format!("Account {account_id} not found")));
        }

        self.audit_unlock(account_id).await;
        Ok(())
    }

    /// Log and audit an unlock committed by the caller.
    pub async fn audit_unlock(&self, account_id: i64) {
        info!(account_id, "Account unlocked");
        self.audit
            .emit(
                AuditEvent::success(AuditCategory::Lockout, "User unlocked")
                    .with_detail("account_id", account_id),
            )
            .await;
    }

    async fn report_error(&self, account_id: i64, username: &str, message: &str, err: &AppError) {
        warn!(account_id, username = %username, error = %err, "{message}");
        self.audit
            .emit(
                AuditEvent::failure(AuditCategory::Lockout, message, err.to_string())
                    .with_detail("account_id", account_id)
                    .with_detail("username", username),
            )
            .await;
    }
}

/// Held critical section of one account.
///
/// The tracker's entry for the account is dropped on release once nobody
/// else holds or awaits it.
pub struct AccountLock<'a> {
    locks: &'a DashMap<i64, Arc<Mutex<()>>>,
    account_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl std::fmt::Debug for AccountLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountLock")
            .field("account_id", &self.account_id)
            .finish()
    }
}

impl Drop for AccountLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.account_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
