//! Integration tests for password storage and login verification.

mod helpers;

use chrono::Duration;

use helpers::{IP, PASSWORD, PASSWORDS, TestApp};
use membership_auth::{LoginFailure, LoginOutcome, PasswordOutcome, PolicyViolation};
use membership_core::traits::Store;
use membership_core::types::SqlValue;
use membership_database::repositories::CredentialRepository;
use membership_entity::policy::keys::{
    CAN_CONTAIN_USERNAME, CHANGE_INTERVAL, MIN_CHARACTERS, NOT_REPEAT_LAST_X_PASSWORDS,
    PASSWORD_RULES,
};

async fn credential_count(app: &TestApp, account_id: i64) -> i64 {
    app.count(
        "SELECT COUNT(*) AS n FROM credentials WHERE account_id = ?",
        &[SqlValue::Int(account_id)],
    )
    .await
}

#[tokio::test]
async fn test_short_password_is_rejected_without_writing() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    let rules = app.engine.policy.password_rules(PASSWORD_RULES).await.unwrap();

    app.advance(Duration::minutes(1));
    let outcome = app
        .engine
        .credentials
        .validate_and_store(id, "Ab1!x", &rules, false)
        .await
        .unwrap();

    assert_eq!(outcome, PasswordOutcome::Rejected(PolicyViolation::TooShort(8)));
    assert_eq!(credential_count(&app, id).await, 1);
}

#[tokio::test]
async fn test_length_rule_disabled_at_zero() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    app.set_rule(MIN_CHARACTERS, 0).await;
    let rules = app.engine.policy.password_rules(PASSWORD_RULES).await.unwrap();

    app.advance(Duration::minutes(1));
    let outcome = app
        .engine
        .credentials
        .validate_and_store(id, "Ab1!x", &rules, false)
        .await
        .unwrap();
    assert!(outcome.is_stored());
}

#[tokio::test]
async fn test_change_closes_previous_credential_at_change_time() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    let rules = app.engine.policy.password_rules(PASSWORD_RULES).await.unwrap();

    app.advance(Duration::hours(2));
    let changed_at = app.now();
    let outcome = app
        .engine
        .credentials
        .validate_and_store(id, PASSWORDS[0], &rules, false)
        .await
        .unwrap();
    assert!(outcome.is_stored());

    let mut conn = app.store.connection().await.unwrap();
    let all = CredentialRepository::find_by_account(&mut *conn, id).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].valid_until, Some(changed_at));
    assert_eq!(all[1].valid_from, changed_at);
    assert_eq!(all[1].valid_until, Some(changed_at + Duration::days(30)));

    let open: Vec<_> = all.iter().filter(|c| c.is_valid_at(changed_at)).collect();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn test_credentials_never_expire_without_change_interval() {
    let app = TestApp::new().await;
    app.set_rule(CHANGE_INTERVAL, 0).await;
    let id = app.create_test_user("alice", PASSWORD).await;

    let mut conn = app.store.connection().await.unwrap();
    let current = CredentialRepository::find_valid(&mut *conn, id, app.now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.valid_until, None);
}

#[tokio::test]
async fn test_last_passwords_cannot_be_reused() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    let rules = app.engine.policy.password_rules(PASSWORD_RULES).await.unwrap();
    assert_eq!(rules.not_repeat_last, 5);

    for password in &PASSWORDS[..5] {
        app.advance(Duration::minutes(1));
        let outcome = app
            .engine
            .credentials
            .validate_and_store(id, password, &rules, false)
            .await
            .unwrap();
        assert!(outcome.is_stored(), "{password} should be accepted");
    }

    // The current password and the four before it are all refused.
    for password in &PASSWORDS[..5] {
        app.advance(Duration::minutes(1));
        let outcome = app
            .engine
            .credentials
            .validate_and_store(id, password, &rules, false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PasswordOutcome::Rejected(PolicyViolation::RecentlyUsed(5)),
            "{password} should be refused"
        );
    }

    // The sixth most recent may come back.
    app.advance(Duration::minutes(1));
    let outcome = app
        .engine
        .credentials
        .validate_and_store(id, PASSWORD, &rules, false)
        .await
        .unwrap();
    assert!(outcome.is_stored());
}

#[tokio::test]
async fn test_reuse_allowed_when_rule_is_zero() {
    let app = TestApp::new().await;
    app.set_rule(NOT_REPEAT_LAST_X_PASSWORDS, 0).await;
    let id = app.create_test_user("alice", PASSWORD).await;
    let rules = app.engine.policy.password_rules(PASSWORD_RULES).await.unwrap();

    app.advance(Duration::minutes(1));
    let outcome = app
        .engine
        .credentials
        .validate_and_store(id, PASSWORD, &rules, false)
        .await
        .unwrap();
    assert!(outcome.is_stored());
}

#[tokio::test]
async fn test_password_containing_username_is_rejected() {
    let app = TestApp::new().await;
    let id = app.create_test_user("kimo", PASSWORD).await;
    let rules = app.engine.policy.password_rules(PASSWORD_RULES).await.unwrap();

    app.advance(Duration::minutes(1));
    let outcome = app
        .engine
        .credentials
        .validate_and_store(id, "Xy7!KIMOz", &rules, false)
        .await
        .unwrap();
    assert_eq!(outcome, PasswordOutcome::Rejected(PolicyViolation::ContainsUsername));

    app.set_rule(CAN_CONTAIN_USERNAME, 1).await;
    let rules = app.engine.policy.password_rules(PASSWORD_RULES).await.unwrap();
    let outcome = app
        .engine
        .credentials
        .validate_and_store(id, "Xy7!KIMOz", &rules, false)
        .await
        .unwrap();
    assert!(outcome.is_stored());
}

#[tokio::test]
async fn test_validate_and_store_unknown_account_is_not_found() {
    let app = TestApp::new().await;
    let rules = app.engine.policy.password_rules(PASSWORD_RULES).await.unwrap();
    let err = app
        .engine
        .credentials
        .validate_and_store(4242, PASSWORD, &rules, false)
        .await
        .unwrap_err();
    assert!(err.is(membership_core::error::ErrorKind::NotFound));
}

#[tokio::test]
async fn test_verify_login_outcomes() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;
    let creds = &app.engine.credentials;

    let ok = creds.verify_login("alice", PASSWORD, IP).await.unwrap();
    assert!(matches!(ok, LoginOutcome::Ok(ref a) if a.username == "alice"));

    let unknown = creds.verify_login("nobody", PASSWORD, IP).await.unwrap();
    assert!(matches!(unknown, LoginOutcome::Failed(LoginFailure::UnknownUser)));

    let wrong = creds.verify_login("alice", "Wrong-pw7X", IP).await.unwrap();
    assert!(matches!(wrong, LoginOutcome::Failed(LoginFailure::WrongPassword)));
}

#[tokio::test]
async fn test_username_lookup_is_case_insensitive() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;

    let outcome = app
        .engine
        .credentials
        .verify_login("ALICE", PASSWORD, IP)
        .await
        .unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_login_refused_before_activation() {
    let app = TestApp::new().await;
    let response = app
        .engine
        .accounts
        .register(helpers::register_request("alice", PASSWORD))
        .await
        .unwrap();
    assert!(matches!(
        response,
        membership_service::account::RegisterResponse::Registered { .. }
    ));

    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORD, IP)
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Failed(LoginFailure::NotActivated)));
}

#[tokio::test]
async fn test_expired_credential_refuses_login() {
    let app = TestApp::new().await;
    app.create_test_user("alice", PASSWORD).await;

    app.advance(Duration::days(31));
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
async fn test_ip_allow_list_restricts_logins() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    app.engine.admin.allow_ip(id, "192.168.1.7").await.unwrap();

    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORD, IP)
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Failed(LoginFailure::IpNotAllowed)));

    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORD, "192.168.1.7")
        .await
        .unwrap();
    assert!(outcome.is_success());

    assert!(app.engine.admin.disallow_ip(id, "192.168.1.7").await.unwrap());
    let outcome = app
        .engine
        .credentials
        .verify_login("alice", PASSWORD, IP)
        .await
        .unwrap();
    assert!(outcome.is_success());
}
