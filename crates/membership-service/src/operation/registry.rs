//! Explicit map from operation key to handler.
//!
//! Handlers are plain functions registered by key at construction; there is
//! no lookup by type or method name.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use membership_core::error::AppError;
use membership_core::result::AppResult;

use super::types::{Request, Response};
use crate::account::{AccountService, ChangePasswordResponse, LoginResponse, RegisterResponse};
use crate::context::RequestContext;

/// Key of the login operation.
pub const PERFORM_LOGIN: &str = "perform-login";
/// Key of the logout operation.
pub const PERFORM_LOGOUT: &str = "perform-logout";
/// Key of the registration operation.
pub const PERFORM_REGISTER: &str = "perform-register";
/// Key of the password change operation.
pub const PERFORM_CHANGE_PASSWORD: &str = "perform-change-password";

/// Future returned by a handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = AppResult<Response>> + Send>>;

/// An operation handler.
pub type Handler = fn(Arc<AccountService>, RequestContext, Request) -> HandlerFuture;

/// Dispatches requests to the handler registered under their key.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    accounts: Arc<AccountService>,
    handlers: HashMap<&'static str, Handler>,
}

impl OperationRegistry {
    /// A registry with the built-in account operations.
    pub fn new(accounts: Arc<AccountService>) -> Self {
        let mut handlers: HashMap<&'static str, Handler> = HashMap::new();
        handlers.insert(PERFORM_LOGIN, perform_login);
        handlers.insert(PERFORM_LOGOUT, perform_logout);
        handlers.insert(PERFORM_REGISTER, perform_register);
        handlers.insert(PERFORM_CHANGE_PASSWORD, perform_change_password);
        Self { accounts, handlers }
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.handlers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Whether a handler is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    /// Run the handler registered under `key`.
    ///
    /// An unknown key is `NotFound`; a request that does not fit the
    /// operation is a validation error.
    pub async fn dispatch(
        &self,
        key: &str,
        ctx: RequestContext,
        request: Request,
    ) -> AppResult<Response> {
        let handler = self
            .handlers
            .get(key)
            .ok_or_else(|| AppError::not_found(format!("Unknown operation '{key}'")))?;

        debug!(operation = %key, request = request.name(), ip = %ctx.ip_address, "Dispatching");
        handler(Arc::clone(&self.accounts), ctx, request).await
    }
}

fn mismatch(key: &str, request: &Request) -> AppError {
    AppError::validation(format!(
        "Operation '{key}' does not accept a {} request",
        request.name()
    ))
}

fn session_token(ctx: &RequestContext) -> AppResult<&str> {
    ctx.session_token
        .as_deref()
        .ok_or_else(|| AppError::authentication("No session token presented"))
}

fn perform_login(
    accounts: Arc<AccountService>,
    ctx: RequestContext,
    request: Request,
) -> HandlerFuture {
    Box::pin(async move {
        let (username, password) = match request {
            Request::Login { username, password } => (username, password),
            other => return Err(mismatch(PERFORM_LOGIN, &other)),
        };
        Ok(
            match accounts.login(&username, &password, &ctx.ip_address).await? {
                LoginResponse::Success { session, token } => Response::LoggedIn { session, token },
                LoginResponse::Failure { message } => Response::LoginFailed { message },
            },
        )
    })
}

fn perform_logout(
    accounts: Arc<AccountService>,
    ctx: RequestContext,
    request: Request,
) -> HandlerFuture {
    Box::pin(async move {
        if !matches!(request, Request::Logout) {
            return Err(mismatch(PERFORM_LOGOUT, &request));
        }
        let session = accounts.logout(session_token(&ctx)?).await?;
        Ok(Response::LoggedOut {
            account_id: session.account_id,
        })
    })
}

fn perform_register(
    accounts: Arc<AccountService>,
    _ctx: RequestContext,
    request: Request,
) -> HandlerFuture {
    Box::pin(async move {
        let req = match request {
            Request::Register(req) => req,
            other => return Err(mismatch(PERFORM_REGISTER, &other)),
        };
        Ok(match accounts.register(req).await? {
            RegisterResponse::Registered { account_id } => Response::Registered { account_id },
            RegisterResponse::Rejected(violation) => Response::RegistrationRejected {
                message: violation.to_string(),
            },
        })
    })
}

fn perform_change_password(
    accounts: Arc<AccountService>,
    ctx: RequestContext,
    request: Request,
) -> HandlerFuture {
    Box::pin(async move {
        let req = match request {
            Request::ChangePassword(req) => req,
            other => return Err(mismatch(PERFORM_CHANGE_PASSWORD, &other)),
        };
        let token = session_token(&ctx)?;
        Ok(
            match accounts.change_password(token, req, &ctx.ip_address).await? {
                ChangePasswordResponse::Changed { token, .. } => Response::PasswordChanged { token },
                ChangePasswordResponse::Rejected { message } => {
                    Response::PasswordRejected { message }
                }
            },
        )
    })
}
