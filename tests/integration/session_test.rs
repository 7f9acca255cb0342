//! Integration tests for signing keys and session tokens.

mod helpers;

use chrono::Duration;

use helpers::{PASSWORD, TestApp};
use membership_core::audit::{AuditCategory, AuditStatus};
use membership_core::error::ErrorKind;

#[tokio::test]
async fn test_issued_session_verifies() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    let token = app.login_token("alice", PASSWORD).await;
    let session = app.engine.sessions.verify_session(&token).await.unwrap();

    assert!(session.logged_in);
    assert_eq!(session.account_id, id);
    assert_eq!(session.username, "alice");
    assert_eq!(session.name, "Test");
    assert!(!session.temporary_password);
    assert!(!session.session_id.is_empty());
}

#[tokio::test]
async fn test_first_session_generates_keys() {
    let app = TestApp::new().await;
    assert!(app.engine.sessions.valid_keys().await.unwrap().is_empty());

    app.create_test_user("alice", PASSWORD).await;
    app.login_token("alice", PASSWORD).await;

    let keys = app.engine.sessions.valid_keys().await.unwrap();
    assert_eq!(keys.len(), app.config.session.keys_per_rotation);
    assert_eq!(
        app.audit
            .find(AuditCategory::SessionKeys, AuditStatus::Success)
            .len(),
        1
    );
}

#[tokio::test]
async fn test_rotation_keeps_earlier_sessions_verifiable() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;
    let before = app.login_token("alice", PASSWORD).await;
    let old_keys = app.engine.sessions.valid_keys().await.unwrap();

    app.advance(Duration::minutes(5));
    let new_ids = app.engine.sessions.rotate_keys(2).await.unwrap();
    assert_eq!(new_ids.len(), 2);

    let keys = app.engine.sessions.valid_keys().await.unwrap();
    assert_eq!(keys.len(), old_keys.len() + 2);
    assert!(new_ids.contains(&keys[0].id));

    let after = app.login_token("alice", PASSWORD).await;
    assert!(app.engine.sessions.verify_session(&before).await.is_ok());
    assert!(app.engine.sessions.verify_session(&after).await.is_ok());
}

#[tokio::test]
async fn test_expired_session_is_refused() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;
    let token = app.login_token("alice", PASSWORD).await;

    app.advance(Duration::hours(app.config.session.session_ttl_hours) + Duration::minutes(1));
    let err = app.engine.sessions.verify_session(&token).await.unwrap_err();
    assert!(err.is(ErrorKind::Authentication));
}

#[tokio::test]
async fn test_expired_keys_are_replaced() {
    let app = TestApp::new().await;
    let first = app.engine.sessions.get_or_create_active_keys(2).await.unwrap();

    app.advance(Duration::days(app.config.session.key_validity_days) + Duration::days(1));
    assert!(app.engine.sessions.valid_keys().await.unwrap().is_empty());

    let second = app.engine.sessions.get_or_create_active_keys(2).await.unwrap();
    assert_eq!(second.len(), 2);
    assert!(second.iter().all(|k| first.iter().all(|f| f.id != k.id)));
}

#[tokio::test]
async fn test_tampered_token_is_refused() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;
    let token = app.login_token("alice", PASSWORD).await;

    let signature_at = token.rfind('.').unwrap() + 5;
    let replaced = if &token[signature_at..=signature_at] == "x" { "y" } else { "x" };
    let mut tampered = token.clone();
    tampered.replace_range(signature_at..=signature_at, replaced);

    let err = app.engine.sessions.verify_session(&tampered).await.unwrap_err();
    assert!(err.is(ErrorKind::Authentication));

    let err = app.engine.sessions.verify_session("not-a-token").await.unwrap_err();
    assert!(err.is(ErrorKind::Authentication));
}

#[tokio::test]
async fn test_rotation_requires_at_least_one_key() {
    let app = TestApp::new().await;
    let err = app.engine.sessions.rotate_keys(0).await.unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}
