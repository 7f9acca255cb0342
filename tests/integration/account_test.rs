//! Integration tests for the account service and the operation registry.

mod helpers;

use std::sync::Arc;

use chrono::Duration;

use helpers::{IP, PASSWORD, PASSWORDS, TestApp, register_request};
use membership_auth::PolicyViolation;
use membership_core::audit::{AuditCategory, AuditStatus};
use membership_core::error::ErrorKind;
use membership_core::traits::{AuditSink, Clock, Store};
use membership_core::types::SqlValue;
use membership_database::DatabaseAuditSink;
use membership_database::repositories::AuditLogRepository;
use membership_service::account::{
    ChangePasswordRequest, ChangePasswordResponse, GENERIC_LOGIN_FAILURE, LoginResponse,
    RegisterResponse,
};
use membership_service::operation::{
    PERFORM_CHANGE_PASSWORD, PERFORM_LOGIN, PERFORM_LOGOUT, PERFORM_REGISTER,
};
use membership_service::{MembershipEngine, Request, RequestContext, Response};

fn change(old: &str, new: &str) -> ChangePasswordRequest {
    ChangePasswordRequest {
        old_password: old.to_string(),
        new_password: new.to_string(),
        confirm_password: new.to_string(),
    }
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = TestApp::new().await;
    let accounts = &app.engine.accounts;

    let mut req = register_request("", PASSWORD);
    let err = accounts.register(req.clone()).await.unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    req = register_request("alice", PASSWORD);
    req.email = " ".to_string();
    assert!(accounts.register(req).await.unwrap_err().is(ErrorKind::Validation));

    req = register_request("alice", PASSWORD);
    req.confirm_password = PASSWORDS[0].to_string();
    assert!(accounts.register(req).await.unwrap_err().is(ErrorKind::Validation));

    assert_eq!(
        app.audit.find(AuditCategory::Register, AuditStatus::Failure).len(),
        3
    );
}

#[tokio::test]
async fn test_register_rejects_duplicates_case_insensitively() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;

    let err = app
        .engine
        .accounts
        .register(register_request("ALICE", PASSWORDS[0]))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    let mut req = register_request("alice2", PASSWORDS[0]);
    req.email = "Alice@Example.com".to_string();
    let err = app.engine.accounts.register(req).await.unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
}

#[tokio::test]
async fn test_rejected_password_leaves_no_account() {
    let app = TestApp::new().await;

    let response = app
        .engine
        .accounts
        .register(register_request("alice", "short1!"))
        .await
        .unwrap();
    assert_eq!(
        response,
        RegisterResponse::Rejected(PolicyViolation::TooShort(8))
    );

    let accounts = app
        .count(
            "SELECT COUNT(*) AS n FROM accounts WHERE LOWER(user_name) = ?",
            &[SqlValue::from("alice")],
        )
        .await;
    assert_eq!(accounts, 0);

    // The name is still free.
    app.create_test_user("alice", PASSWORD).await;
}

#[tokio::test]
async fn test_activate_only_once() {
    let app = TestApp::new().await;
    let response = app
        .engine
        .accounts
        .register(register_request("alice", PASSWORD))
        .await
        .unwrap();
    let RegisterResponse::Registered { account_id } = response else {
        panic!("unexpected {response:?}");
    };

    assert!(app.engine.accounts.activate(account_id).await.unwrap());
    assert!(!app.engine.accounts.activate(account_id).await.unwrap());

    let account = app.engine.admin.find_account("alice").await.unwrap();
    assert!(account.is_activated);
    assert_eq!(account.activated_at, Some(app.now()));

    let err = app.engine.accounts.activate(777).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;

    for (username, password) in [("alice", "Wrong-pw7X"), ("nobody", PASSWORD)] {
        match app.login(username, password).await {
            LoginResponse::Failure { message } => assert_eq!(message, GENERIC_LOGIN_FAILURE),
            LoginResponse::Success { .. } => panic!("{username} should not log in"),
        }
    }
}

#[tokio::test]
async fn test_login_stamps_last_connect() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;

    app.advance(Duration::minutes(3));
    assert!(app.login("alice", PASSWORD).await.is_success());

    let account = app.engine.admin.find_account("alice").await.unwrap();
    assert_eq!(account.last_connect_at, Some(app.now()));
    assert_eq!(account.last_connect_ip.as_deref(), Some(IP));
}

#[tokio::test]
async fn test_logout_requires_valid_session() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    let token = app.login_token("alice", PASSWORD).await;

    let session = app.engine.accounts.logout(&token).await.unwrap();
    assert_eq!(session.account_id, id);
    assert_eq!(
        app.audit.find(AuditCategory::Logout, AuditStatus::Success).len(),
        1
    );

    let err = app.engine.accounts.logout("garbage").await.unwrap_err();
    assert!(err.is(ErrorKind::Authentication));
}

#[tokio::test]
async fn test_change_password_checks_input_and_old_password() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;
    let token = app.login_token("alice", PASSWORD).await;
    let accounts = &app.engine.accounts;

    let cases = [
        change("", PASSWORDS[0]),
        ChangePasswordRequest {
            confirm_password: PASSWORDS[1].to_string(),
            ..change(PASSWORD, PASSWORDS[0])
        },
        change(PASSWORD, PASSWORD),
        change("Wrong-pw7X", PASSWORDS[0]),
    ];
    for req in cases {
        let response = accounts.change_password(&token, req, IP).await.unwrap();
        assert!(matches!(response, ChangePasswordResponse::Rejected { .. }));
    }

    let response = accounts
        .change_password(&token, change(PASSWORD, "weak"), IP)
        .await
        .unwrap();
    let ChangePasswordResponse::Rejected { message } = response else {
        panic!("weak password accepted");
    };
    assert_eq!(message, PolicyViolation::TooShort(8).to_string());

    let err = accounts
        .change_password("garbage", change(PASSWORD, PASSWORDS[0]), IP)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authentication));
}

#[tokio::test]
async fn test_change_password_clears_temporary_flag() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    app.advance(Duration::minutes(1));
    app.engine
        .admin
        .reset_password(id, PASSWORDS[0])
        .await
        .unwrap();

    let LoginResponse::Success { session, token } = app.login("alice", PASSWORDS[0]).await else {
        panic!("temporary password refused");
    };
    assert!(session.temporary_password);

    app.advance(Duration::minutes(1));
    let response = app
        .engine
        .accounts
        .change_password(&token, change(PASSWORDS[0], PASSWORDS[1]), IP)
        .await
        .unwrap();
    let ChangePasswordResponse::Changed { session, token } = response else {
        panic!("change refused: {response:?}");
    };
    assert!(!session.temporary_password);

    let verified = app.engine.sessions.verify_session(&token).await.unwrap();
    assert!(!verified.temporary_password);

    let LoginResponse::Success { session, .. } = app.login("alice", PASSWORDS[1]).await else {
        panic!("new password refused");
    };
    assert!(!session.temporary_password);
}

#[tokio::test]
async fn test_registry_dispatches_by_key() {
    let app = TestApp::new().await;
    let registry = app.engine.operations();
    assert_eq!(
        registry.keys(),
        [
            PERFORM_CHANGE_PASSWORD,
            PERFORM_LOGIN,
            PERFORM_LOGOUT,
            PERFORM_REGISTER
        ]
    );

    let ctx = RequestContext::new(IP, app.now());
    let response = registry
        .dispatch(
            PERFORM_REGISTER,
            ctx.clone(),
            Request::Register(register_request("alice", PASSWORD)),
        )
        .await
        .unwrap();
    let Response::Registered { account_id } = response else {
        panic!("unexpected {response:?}");
    };
    app.engine.accounts.activate(account_id).await.unwrap();

    let login = Request::Login {
        username: "alice".to_string(),
        password: PASSWORD.to_string(),
    };
    let Response::LoggedIn { token, .. } = registry
        .dispatch(PERFORM_LOGIN, ctx.clone(), login)
        .await
        .unwrap()
    else {
        panic!("login refused");
    };

    let authed = ctx.clone().with_session_token(token);
    let response = registry
        .dispatch(
            PERFORM_CHANGE_PASSWORD,
            authed.clone(),
            Request::ChangePassword(change(PASSWORD, PASSWORDS[0])),
        )
        .await
        .unwrap();
    assert!(matches!(response, Response::PasswordChanged { .. }));

    let response = registry
        .dispatch(PERFORM_LOGOUT, authed, Request::Logout)
        .await
        .unwrap();
    assert!(matches!(response, Response::LoggedOut { account_id: id } if id == account_id));

    let bad = Request::Login {
        username: "alice".to_string(),
        password: "Wrong-pw7X".to_string(),
    };
    let response = registry.dispatch(PERFORM_LOGIN, ctx, bad).await.unwrap();
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_registry_rejects_unknown_and_mismatched_requests() {
    let app = TestApp::new().await;
    let registry = app.engine.operations();
    let ctx = RequestContext::new(IP, app.now());

    let err = registry
        .dispatch("perform-teleport", ctx.clone(), Request::Logout)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let err = registry
        .dispatch(PERFORM_LOGIN, ctx.clone(), Request::Logout)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    let err = registry
        .dispatch(PERFORM_LOGOUT, ctx, Request::Logout)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authentication));
}

#[tokio::test]
async fn test_audit_entries_persist_through_database_sink() {
    let app = TestApp::new().await;
    let store: Arc<dyn Store> = app.store.clone();
    let clock: Arc<dyn Clock> = app.clock.clone();
    let audit: Arc<dyn AuditSink> =
        Arc::new(DatabaseAuditSink::new(Arc::clone(&store), Arc::clone(&clock)));
    let engine = MembershipEngine::new(store, audit, clock, &app.config).unwrap();

    engine
        .accounts
        .register(register_request("alice", PASSWORD))
        .await
        .unwrap();
    engine
        .credentials
        .verify_login("alice", "Wrong-pw7X", IP)
        .await
        .unwrap();

    let mut conn = app.store.connection().await.unwrap();
    let registered = AuditLogRepository::find_recent(&mut *conn, Some("register"), 10)
        .await
        .unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].status, "success");
    assert_eq!(registered[0].details["username"], "alice");

    let logins = AuditLogRepository::find_recent(&mut *conn, Some("login"), 10)
        .await
        .unwrap();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].status, "failure");
}
