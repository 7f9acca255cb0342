//! Self-service account operations: registration, login, logout, and
//! password change.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use membership_auth::{
    CredentialValidator, LoginOutcome, PasswordOutcome, PolicyStore, PolicyViolation,
    SessionKeyManager,
};
use membership_core::audit::{AuditCategory, AuditEvent};
use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, Clock, Store};
use membership_database::repositories::AccountRepository;
use membership_entity::account::CreateAccount;
use membership_entity::session::Session;

/// The only message a client ever sees for a refused login.
pub const GENERIC_LOGIN_FAILURE: &str = "Unknown user or wrong password.";

/// Registration input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Requested login name.
    pub username: String,
    /// Initial password.
    pub password: String,
    /// Repeated password.
    pub confirm_password: String,
    /// Given name.
    #[serde(default)]
    pub name: String,
    /// Family name.
    #[serde(default)]
    pub surname: String,
    /// Contact address.
    pub email: String,
}

/// Result of a registration that passed input validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterResponse {
    /// The account and its first credential were created.
    Registered {
        /// The new account's identifier.
        account_id: i64,
    },
    /// The password broke a rule; nothing was written.
    Rejected(PolicyViolation),
}

/// Result of a login attempt.
#[derive(Debug, Clone)]
pub enum LoginResponse {
    /// The client is logged in.
    Success {
        /// The new session.
        session: Session,
        /// Signed token carrying the session.
        token: String,
    },
    /// The login was refused. The message never says why.
    Failure {
        /// User-facing message.
        message: String,
    },
}

impl LoginResponse {
    /// Whether the login succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Password change input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password.
    pub old_password: String,
    /// Replacement password.
    pub new_password: String,
    /// Repeated replacement password.
    pub confirm_password: String,
}

/// Result of a password change.
#[derive(Debug, Clone)]
pub enum ChangePasswordResponse {
    /// The new password is in force.
    Changed {
        /// Updated session, with the temporary-password flag cleared.
        session: Session,
        /// Token carrying the updated session.
        token: String,
    },
    /// The change was refused.
    Rejected {
        /// User-facing reason.
        message: String,
    },
}

/// Account operations invoked by the account holder.
#[derive(Debug, Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    policy: Arc<PolicyStore>,
    policy_group: String,
    credentials: Arc<CredentialValidator>,
    sessions: Arc<SessionKeyManager>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    /// Creates a new account service.
    pub fn new(
        store: Arc<dyn Store>,
        policy: Arc<PolicyStore>,
        policy_group: impl Into<String>,
        credentials: Arc<CredentialValidator>,
        sessions: Arc<SessionKeyManager>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            policy,
            policy_group: policy_group.into(),
            credentials,
            sessions,
            audit,
            clock,
        }
    }

    /// Create an account together with its first credential.
    ///
    /// Both rows are written in one unit of work; a password that breaks a
    /// rule leaves no account behind.
    pub async fn register(&self, req: RegisterRequest) -> AppResult<RegisterResponse> {
        let username = req.username.trim();
        let email = req.email.trim();

        let invalid = if username.is_empty() {
            Some("Username is required")
        } else if email.is_empty() {
            Some("Email is required")
        } else if req.password != req.confirm_password {
            Some("Passwords do not match")
        } else {
            None
        };
        if let Some(message) = invalid {
            self.audit_register_failure(username, message).await;
            return Err(AppError::validation(message));
        }

        let rules = self.policy.password_rules(&self.policy_group).await?;
        let now = self.clock.now();

        let mut uow = self.store.begin().await?;

        let conflict = if AccountRepository::username_taken(&mut *uow, username).await? {
            Some(format!("Username '{username}' is already taken"))
        } else if AccountRepository::email_taken(&mut *uow, email).await? {
            Some(format!("Email '{email}' is already registered"))
        } else {
            None
        };
        if let Some(message) = conflict {
            uow.rollback().await?;
            self.audit_register_failure(username, &message).await;
            return Err(AppError::conflict(message));
        }

        let data = CreateAccount {
            username: username.to_string(),
            name: req.name.trim().to_string(),
            surname: req.surname.trim().to_string(),
            email: email.to_string(),
        };
        let account_id = AccountRepository::create(&mut *uow, &data, now).await?;

        let outcome = self
            .credentials
            .validate_and_store_in(&mut *uow, account_id, &req.password, &rules, false, now)
            .await?;

        match outcome {
            PasswordOutcome::Stored { .. } => {
                uow.commit().await?;
                info!(account_id, username = %username, "Account registered");
                self.audit
                    .emit(
                        AuditEvent::success(AuditCategory::Register, "Account registered")
                            .with_detail("account_id", account_id)
                            .with_detail("username", username),
                    )
                    .await;
                Ok(RegisterResponse::Registered { account_id })
            }
            PasswordOutcome::Rejected(violation) => {
                uow.rollback().await?;
                self.audit_register_failure(username, &violation.to_string())
                    .await;
                Ok(RegisterResponse::Rejected(violation))
            }
        }
    }

    /// Mark an account as activated. Returns `false` if it already was.
    pub async fn activate(&self, account_id: i64) -> AppResult<bool> {
        let now = self.clock.now();
        let changed = {
            let mut conn = self.store.connection().await?;
            if AccountRepository::find_by_id(&mut *conn, account_id)
                .await?
                .is_none()
            {
                return Err(AppError::not_found(format!("Account {account_id} not found")));
            }
            AccountRepository::activate(&mut *conn, account_id, now).await?
        };

        if changed {
            info!(account_id, "Account activated");
            self.audit
                .emit(
                    AuditEvent::success(AuditCategory::Activate, "Account activated")
                        .with_detail("account_id", account_id),
                )
                .await;
        }
        Ok(changed)
    }

    /// Authenticate and, on success, start a session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client_ip: &str,
    ) -> AppResult<LoginResponse> {
        let (account, temporary) = match self
            .credentials
            .verify_login(username, password, client_ip)
            .await?
        {
            LoginOutcome::Ok(account) => (account, false),
            LoginOutcome::TemporaryPassword(account) => (account, true),
            LoginOutcome::Failed(_) => {
                return Ok(LoginResponse::Failure {
                    message: GENERIC_LOGIN_FAILURE.to_string(),
                });
            }
        };

        {
            let mut conn = self.store.connection().await?;
            AccountRepository::record_connect(&mut *conn, account.id, client_ip, self.clock.now())
                .await?;
        }

        let (session, token) = self.sessions.issue_session(&account, temporary).await?;
        info!(
            account_id = account.id,
            session_id = %session.session_id,
            temporary,
            "User logged in"
        );
        Ok(LoginResponse::Success { session, token })
    }

    /// End the session carried by `token`.
    pub async fn logout(&self, token: &str) -> AppResult<Session> {
        let session = self.sessions.verify_session(token).await?;
        info!(account_id = session.account_id, session_id = %session.session_id, "User logged out");
        self.audit
            .emit(
                AuditEvent::success(AuditCategory::Logout, "User logged out")
                    .with_detail("account_id", session.account_id)
                    .with_detail("session_id", session.session_id.as_str()),
            )
            .await;
        Ok(session)
    }

    /// Replace the password of the account the session belongs to.
    ///
    /// An invalid or expired token is an authentication error; every other
    /// refusal is a [`ChangePasswordResponse::Rejected`].
    pub async fn change_password(
        &self,
        token: &str,
        req: ChangePasswordRequest,
        client_ip: &str,
    ) -> AppResult<ChangePasswordResponse> {
        let session = self.sessions.verify_session(token).await?;

        let invalid = if req.old_password.is_empty() {
            Some("The current password is required")
        } else if req.new_password != req.confirm_password {
            Some("Passwords do not match")
        } else if req.new_password == req.old_password {
            Some("The new password must differ from the current one")
        } else {
            None
        };
        if let Some(message) = invalid {
            return Ok(self.reject_change(&session, message).await);
        }

        let verified = self
            .credentials
            .verify_login(&session.username, &req.old_password, client_ip)
            .await?;
        if !verified.is_success() {
            warn!(account_id = session.account_id, "Password change with wrong current password");
            return Ok(self.reject_change(&session, GENERIC_LOGIN_FAILURE).await);
        }

        let rules = self.policy.password_rules(&self.policy_group).await?;
        match self
            .credentials
            .validate_and_store(session.account_id, &req.new_password, &rules, false)
            .await?
        {
            PasswordOutcome::Stored { .. } => {
                let session = Session {
                    temporary_password: false,
                    ..session
                };
                let token = self.sessions.refresh_session(&session).await?;
                Ok(ChangePasswordResponse::Changed { session, token })
            }
            PasswordOutcome::Rejected(violation) => Ok(ChangePasswordResponse::Rejected {
                message: violation.to_string(),
            }),
        }
    }

    async fn reject_change(&self, session: &Session, message: &str) -> ChangePasswordResponse {
        self.audit
            .emit(
                AuditEvent::failure(
                    AuditCategory::PasswordChange,
                    "Password change refused",
                    message,
                )
                .with_detail("account_id", session.account_id),
            )
            .await;
        ChangePasswordResponse::Rejected {
            message: message.to_string(),
        }
    }

    async fn audit_register_failure(&self, username: &str, reason: &str) {
        self.audit
            .emit(
                AuditEvent::failure(AuditCategory::Register, "Registration refused", reason)
                    .with_detail("username", username),
            )
            .await;
    }
}
