//! Role registry.
//!
//! Assignments are intervals. Revoking closes the live interval, copies it
//! to the history table and removes it from the live table, all in one
//! unit of work. "As of" queries read both tables, so past membership stays
//! answerable after revocation.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use membership_core::audit::{AuditCategory, AuditEvent};
use membership_core::error::{AppError, ErrorKind};
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, Clock, SqlExecutor, Store};
use membership_database::repositories::{
    AccountRepository, RoleAssignmentRepository, RoleRepository,
};
use membership_entity::role::Role;

/// Creates roles and answers membership questions.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl RoleRegistry {
    /// Creates a new role registry.
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            audit,
            clock,
        }
    }

    /// Id of the role named `name` (case-insensitive), creating it if needed.
    pub async fn ensure_role(&self, name: &str) -> AppResult<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Role name must not be empty"));
        }

        let mut uow = self.store.begin().await?;
        if let Some(role) = RoleRepository::find_by_name(&mut *uow, name).await? {
            return Ok(role.id);
        }

        let id = match RoleRepository::insert(&mut *uow, name).await {
            Ok(id) => {
                uow.commit().await?;
                id
            }
            // Lost a race with a concurrent creator.
            Err(e) if e.is(ErrorKind::Conflict) => {
                drop(uow);
                let mut conn = self.store.connection().await?;
                return RoleRepository::find_by_name(&mut *conn, name)
                    .await?
                    .map(|role| role.id)
                    .ok_or(e);
            }
            Err(e) => return Err(e),
        };

        info!(role_id = id, role = %name, "Role created");
        self.audit
            .emit(
                AuditEvent::success(AuditCategory::Role, "Role created")
                    .with_detail("role_id", id)
                    .with_detail("role", name),
            )
            .await;
        Ok(id)
    }

    /// Rename a role. The new name must not collide (case-insensitive)
    /// with another role.
    pub async fn rename_role(&self, role_id: i64, new_name: &str) -> AppResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(AppError::validation("Role name must not be empty"));
        }

        let old_name = {
            let mut uow = self.store.begin().await?;
            let role = RoleRepository::find_by_id(&mut *uow, role_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Role {role_id} not found")))?;

            if let Some(other) = RoleRepository::find_by_name(&mut *uow, new_name).await? {
                if other.id != role_id {
                    return Err(AppError::conflict(format!(
                        "Role \"{new_name}\" already exists"
                    )));
                }
            }

            RoleRepository::rename(&mut *uow, role_id, new_name).await?;
            uow.commit().await?;
            role.name
        };

        info!(role_id, from = %old_name, to = %new_name, "Role renamed");
        self.audit
            .emit(
                AuditEvent::success(AuditCategory::Role, "Role renamed")
                    .with_detail("role_id", role_id)
                    .with_detail("from", old_name)
                    .with_detail("to", new_name),
            )
            .await;
        Ok(())
    }

    /// The role called `name`, compared case-insensitively.
    pub async fn find_role(&self, name: &str) -> AppResult<Role> {
        let mut conn = self.store.connection().await?;
        self.require_role(&mut *conn, name.trim()).await
    }

    /// Every role, ordered by name.
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let mut conn = self.store.connection().await?;
        RoleRepository::find_all(&mut *conn).await
    }

    /// Give an account a role from `from` (default: now) onward.
    ///
    /// Returns `false` without writing if the account already holds the
    /// role at `from`. A live assignment that only starts later is moved
    /// back to `from` rather than duplicated.
    pub async fn assign(
        &self,
        account_id: i64,
        role_name: &str,
        from: Option<DateTime<Utc>>,
    ) -> AppResult<bool> {
        let from = from.unwrap_or_else(|| self.clock.now());

        let role_id = {
            let mut uow = self.store.begin().await?;
            let role = self.require_role(&mut *uow, role_name).await?;
            if AccountRepository::find_by_id(&mut *uow, account_id).await?.is_none() {
                return Err(AppError::not_found(format!("Account {account_id} not found")));
            }

            match RoleAssignmentRepository::find_overlapping(&mut *uow, account_id, role.id, from)
                .await?
            {
                Some(existing) if existing.valid_from <= from => return Ok(false),
                Some(existing) => {
                    RoleAssignmentRepository::reschedule(&mut *uow, &existing, from).await?;
                }
                None => {
                    RoleAssignmentRepository::insert(&mut *uow, account_id, role.id, from).await?;
                }
            }
            uow.commit().await?;
            role.id
        };

        info!(account_id, role_id, role = %role_name, "Role assigned");
        self.audit
            .emit(
                AuditEvent::success(AuditCategory::Role, "Role assigned")
                    .with_detail("account_id", account_id)
                    .with_detail("role_id", role_id)
                    .with_detail("role", role_name),
            )
            .await;
        Ok(true)
    }

    /// End an account's membership of a role at `at` (default: now).
    ///
    /// Returns `false` without writing if the account does not hold the role
    /// at `at`.
    pub async fn revoke(
        &self,
        account_id: i64,
        role_name: &str,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<bool> {
        let at = at.unwrap_or_else(|| self.clock.now());

        {
            let mut uow = self.store.begin().await?;
            let role = self.require_role(&mut *uow, role_name).await?;

            let Some(active) =
                RoleAssignmentRepository::find_active(&mut *uow, account_id, role.id, at).await?
            else {
                return Ok(false);
            };

            RoleAssignmentRepository::close(&mut *uow, &active, at).await?;
            RoleAssignmentRepository::archive(&mut *uow, &active, at).await?;
            RoleAssignmentRepository::delete(&mut *uow, &active).await?;
            uow.commit().await?;
        }

        info!(account_id, role = %role_name, "Role revoked");
        self.audit
            .emit(
                AuditEvent::success(AuditCategory::Role, "Role revoked")
                    .with_detail("account_id", account_id)
                    .with_detail("role", role_name),
            )
            .await;
        Ok(true)
    }

    /// Names of the roles an account holds at `at` (default: now).
    pub async fn effective_roles(
        &self,
        account_id: i64,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<BTreeSet<String>> {
        let at = at.unwrap_or_else(|| self.clock.now());
        let mut conn = self.store.connection().await?;
        let names = RoleAssignmentRepository::effective_role_names(&mut *conn, account_id, at).await?;
        Ok(names.into_iter().collect())
    }

    /// Whether `username` holds `role_name` at `at` (default: now).
    ///
    /// Unknown users hold no roles.
    pub async fn is_in_role(
        &self,
        username: &str,
        role_name: &str,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<bool> {
        let account = {
            let mut conn = self.store.connection().await?;
            AccountRepository::find_by_username(&mut *conn, username).await?
        };
        let Some(account) = account else {
            return Ok(false);
        };

        let roles = self.effective_roles(account.id, at).await?;
        Ok(roles.iter().any(|r| r.eq_ignore_ascii_case(role_name)))
    }

    async fn require_role<E>(&self, db: &mut E, role_name: &str) -> AppResult<Role>
    where
        E: SqlExecutor + ?Sized,
    {
        RoleRepository::find_by_name(db, role_name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role \"{role_name}\" not found")))
    }
}
