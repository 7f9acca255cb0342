//! Integration tests for failure counting and account locking.

mod helpers;

use chrono::Duration;

use std::sync::Arc;

use helpers::{FailingStore, IP, PASSWORD, PASSWORDS, TestApp};
use membership_auth::{LockoutState, LoginFailure, LoginOutcome, PasswordOutcome};
use membership_core::audit::{AuditCategory, AuditStatus};
use membership_core::error::ErrorKind;
use membership_core::traits::{AuditSink, Clock, Store};
use membership_core::types::SqlValue;
use membership_entity::policy::keys::{MAX_ALLOWED_FAILED_ATTEMPTS, PASSWORD_RULES};
use membership_service::MembershipEngine;

const WRONG: &str = "Wrong-pw7X";

async fn fail_login(app: &TestApp, username: &str) -> LoginOutcome {
    app.engine
        .credentials
        .verify_login(username, WRONG, IP)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_third_failure_locks_account() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    fail_login(&app, "alice").await;
    app.advance(Duration::minutes(1));
    fail_login(&app, "alice").await;
    assert!(matches!(
        app.engine.lockout.status(id).await.unwrap(),
        LockoutState::Accumulating {
            failed_attempts: 2,
            ..
        }
    ));

    app.advance(Duration::minutes(1));
    fail_login(&app, "alice").await;
    assert_eq!(app.engine.lockout.status(id).await.unwrap(), LockoutState::Locked);

    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORD, IP)
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Failed(LoginFailure::Locked)));

    let locked = app.audit.find(AuditCategory::Lockout, AuditStatus::Failure);
    assert_eq!(locked.len(), 1);
    assert_eq!(locked[0].message, "User locked out");
}

#[tokio::test]
async fn test_lock_closes_open_credentials() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    for _ in 0..3 {
        app.advance(Duration::seconds(10));
        fail_login(&app, "alice").await;
    }

    let open = app
        .count(
            "SELECT COUNT(*) AS n FROM credentials \
             WHERE account_id = ? AND (valid_until IS NULL OR valid_until > ?)",
            &[SqlValue::Int(id), SqlValue::Timestamp(app.now())],
        )
        .await;
    assert_eq!(open, 0);
}

#[tokio::test]
async fn test_success_between_windows_does_not_lock() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    fail_login(&app, "alice").await;
    fail_login(&app, "alice").await;
    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORD, IP)
        .await
        .unwrap();
    assert!(outcome.is_success());

    app.advance(Duration::minutes(11));
    fail_login(&app, "alice").await;
    fail_login(&app, "alice").await;

    assert!(matches!(
        app.engine.lockout.status(id).await.unwrap(),
        LockoutState::Accumulating {
            failed_attempts: 2,
            ..
        }
    ));
    let account = app.engine.admin.find_account("alice").await.unwrap();
    assert!(!account.is_locked);
}

#[tokio::test]
async fn test_window_expiry_restarts_count_at_one() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    fail_login(&app, "alice").await;
    fail_login(&app, "alice").await;

    app.advance(Duration::minutes(11));
    assert_eq!(app.engine.lockout.status(id).await.unwrap(), LockoutState::Clear);

    fail_login(&app, "alice").await;
    let state = app.engine.lockout.status(id).await.unwrap();
    assert_eq!(
        state,
        LockoutState::Accumulating {
            failed_attempts: 1,
            first_failed_at: Some(app.now()),
        }
    );
}

#[tokio::test]
async fn test_zero_max_attempts_disables_locking() {
    let app = TestApp::new().await;
    app.set_rule(MAX_ALLOWED_FAILED_ATTEMPTS, 0).await;
    app.create_test_user("alice", PASSWORD).await;

    for _ in 0..6 {
        fail_login(&app, "alice").await;
    }

    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORD, IP)
        .await
        .unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_unknown_user_failures_are_not_counted() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    for _ in 0..5 {
        let outcome = fail_login(&app, "mallory").await;
        assert!(matches!(outcome, LoginOutcome::Failed(LoginFailure::UnknownUser)));
    }

    assert_eq!(app.engine.lockout.status(id).await.unwrap(), LockoutState::Clear);
    assert_eq!(
        app.audit.find(AuditCategory::Login, AuditStatus::Failure).len(),
        5
    );
}

#[tokio::test]
async fn test_concurrent_failures_are_all_counted() {
    let app = TestApp::new().await;
    app.set_rule(MAX_ALLOWED_FAILED_ATTEMPTS, 10).await;
    let id = app.create_test_user("alice", PASSWORD).await;

    let creds = app.engine.credentials.clone();
    let attempts = (0..4).map(|_| {
        let creds = creds.clone();
        tokio::spawn(async move { creds.verify_login("alice", WRONG, IP).await.unwrap() })
    });
    for handle in attempts.collect::<Vec<_>>() {
        handle.await.unwrap();
    }

    assert!(matches!(
        app.engine.lockout.status(id).await.unwrap(),
        LockoutState::Accumulating {
            failed_attempts: 4,
            ..
        }
    ));
}

#[tokio::test]
async fn test_reset_password_unlocks_with_temporary_credential() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    for _ in 0..3 {
        fail_login(&app, "alice").await;
    }
    assert_eq!(app.engine.lockout.status(id).await.unwrap(), LockoutState::Locked);

    app.advance(Duration::minutes(5));
    let outcome = app
        .engine
        .admin
        .reset_password(id, PASSWORDS[0])
        .await
        .unwrap();
    assert!(matches!(outcome, PasswordOutcome::Stored { .. }));
    assert_eq!(app.engine.lockout.status(id).await.unwrap(), LockoutState::Clear);

    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORDS[0], IP)
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::TemporaryPassword(_)));

    // The old password stays closed after the lock.
    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORD, IP)
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Failed(LoginFailure::WrongPassword)));
}

#[tokio::test]
async fn test_unlock_alone_leaves_no_credential() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    for _ in 0..3 {
        fail_login(&app, "alice").await;
    }

    app.engine.admin.unlock(id).await.unwrap();
    app.advance(Duration::seconds(1));
    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORD, IP)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        LoginOutcome::Failed(LoginFailure::NoValidCredential)
    ));
}

#[tokio::test]
async fn test_unlock_unknown_account_is_not_found() {
    let app = TestApp::new().await;
    let err = app.engine.admin.unlock(999).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_failed_unlock_keeps_reset_password_out() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    for _ in 0..3 {
        fail_login(&app, "alice").await;
    }

    let store: Arc<dyn Store> = Arc::new(FailingStore::new(app.store.clone(), "is_locked = 0"));
    let audit: Arc<dyn AuditSink> = app.audit.clone();
    let clock: Arc<dyn Clock> = app.clock.clone();
    let engine = MembershipEngine::new(store, audit, clock, &app.config).unwrap();

    app.advance(Duration::minutes(5));
    let err = engine.admin.reset_password(id, PASSWORDS[0]).await.unwrap_err();
    assert!(err.is(ErrorKind::Database));

    assert_eq!(app.engine.lockout.status(id).await.unwrap(), LockoutState::Locked);
    let credentials = app
        .count(
            "SELECT COUNT(*) AS n FROM credentials WHERE account_id = ?",
            &[SqlValue::Int(id)],
        )
        .await;
    assert_eq!(credentials, 1);

    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORDS[0], IP)
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Failed(LoginFailure::Locked)));
}

#[tokio::test]
async fn test_critical_sections_are_released() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    for _ in 0..3 {
        fail_login(&app, "alice").await;
    }
    assert_eq!(app.engine.lockout.tracked_accounts(), 0);

    app.engine.admin.reset_password(id, PASSWORDS[0]).await.unwrap();
    app.engine.admin.unlock(id).await.unwrap();
    assert_eq!(app.engine.lockout.tracked_accounts(), 0);

    {
        let _held = app.engine.lockout.lock_account(id).await;
        assert_eq!(app.engine.lockout.tracked_accounts(), 1);
    }
    assert_eq!(app.engine.lockout.tracked_accounts(), 0);
}

#[tokio::test]
async fn test_status_reports_unreadable_rules() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    fail_login(&app, "alice").await;

    {
        let mut conn = app.store.connection().await.unwrap();
        conn.execute(
            "DELETE FROM policy_parameters WHERE param_group = ?",
            &[SqlValue::from(PASSWORD_RULES)],
        )
        .await
        .unwrap();
    }
    app.engine.policy.invalidate(PASSWORD_RULES).await;

    let err = app.engine.lockout.status(id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}
