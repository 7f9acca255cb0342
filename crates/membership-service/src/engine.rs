//! Wiring of the membership components over one store.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use membership_auth::{
    CredentialValidator, LockoutTracker, PasswordHasher, PolicyStore, RoleRegistry,
    SessionKeyManager,
};
use membership_core::config::AppConfig;
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, Clock, Store};

use crate::account::{AccountService, AdminAccountService};
use crate::operation::OperationRegistry;

/// Every component of the engine, sharing one store, audit sink, and clock.
#[derive(Debug, Clone)]
pub struct MembershipEngine {
    /// Backing store.
    pub store: Arc<dyn Store>,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Cached parameter groups.
    pub policy: Arc<PolicyStore>,
    /// Failure counting and locking.
    pub lockout: Arc<LockoutTracker>,
    /// Password storage and login verification.
    pub credentials: Arc<CredentialValidator>,
    /// Roles and role membership.
    pub roles: Arc<RoleRegistry>,
    /// Signing keys and session tokens.
    pub sessions: Arc<SessionKeyManager>,
    /// Self-service account operations.
    pub accounts: Arc<AccountService>,
    /// Administrative account operations.
    pub admin: Arc<AdminAccountService>,
}

impl MembershipEngine {
    /// Build the component graph.
    ///
    /// The schema must already exist and the default parameters must be
    /// seeded.
    pub fn new(
        store: Arc<dyn Store>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> AppResult<Self> {
        let group = config.auth.policy_group.clone();

        let policy = Arc::new(PolicyStore::new(
            Arc::clone(&store),
            Duration::from_secs(config.auth.policy_cache_ttl_seconds),
        ));
        let hasher = Arc::new(PasswordHasher::new(&config.auth.hashing)?);
        let lockout = Arc::new(LockoutTracker::new(
            Arc::clone(&store),
            Arc::clone(&policy),
            group.clone(),
            Arc::clone(&audit),
            Arc::clone(&clock),
        ));
        let credentials = Arc::new(CredentialValidator::new(
            Arc::clone(&store),
            hasher,
            Arc::clone(&lockout),
            Arc::clone(&audit),
            Arc::clone(&clock),
        ));
        let roles = Arc::new(RoleRegistry::new(
            Arc::clone(&store),
            Arc::clone(&audit),
            Arc::clone(&clock),
        ));
        let sessions = Arc::new(SessionKeyManager::new(
            Arc::clone(&store),
            Arc::clone(&audit),
            Arc::clone(&clock),
            config.session.clone(),
        ));
        let accounts = Arc::new(AccountService::new(
            Arc::clone(&store),
            Arc::clone(&policy),
            group.clone(),
            Arc::clone(&credentials),
            Arc::clone(&sessions),
            Arc::clone(&audit),
            Arc::clone(&clock),
        ));
        let admin = Arc::new(AdminAccountService::new(
            Arc::clone(&store),
            Arc::clone(&policy),
            group,
            Arc::clone(&credentials),
            Arc::clone(&lockout),
            Arc::clone(&audit),
        ));

        info!(policy_group = %config.auth.policy_group, "Membership engine initialized");

        Ok(Self {
            store,
            audit,
            clock,
            policy,
            lockout,
            credentials,
            roles,
            sessions,
            accounts,
            admin,
        })
    }

    /// The request dispatcher over this engine's account service.
    pub fn operations(&self) -> OperationRegistry {
        OperationRegistry::new(Arc::clone(&self.accounts))
    }
}
