//! Integration tests for roles and temporal role membership.

mod helpers;

use chrono::Duration;

use helpers::{PASSWORD, TestApp};
use membership_core::error::ErrorKind;
use membership_core::traits::Store;
use membership_core::types::SqlValue;
use membership_database::repositories::RoleAssignmentRepository;

#[tokio::test]
async fn test_ensure_role_is_idempotent() {
    let app = TestApp::new().await;

    let first = app.engine.roles.ensure_role("Admin").await.unwrap();
    let second = app.engine.roles.ensure_role("Admin").await.unwrap();
    let third = app.engine.roles.ensure_role("  admin ").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, third);
    let rows = app
        .count(
            "SELECT COUNT(*) AS n FROM roles WHERE LOWER(name) = ?",
            &[SqlValue::from("admin")],
        )
        .await;
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_default_roles_are_seeded() {
    let app = TestApp::new().await;
    let names: Vec<String> = app
        .engine
        .roles
        .list_roles()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, ["Administrator", "All", "Member"]);
}

#[tokio::test]
async fn test_empty_role_name_is_rejected() {
    let app = TestApp::new().await;
    let err = app.engine.roles.ensure_role("   ").await.unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}

#[tokio::test]
async fn test_rename_conflicts_with_existing_role() {
    let app = TestApp::new().await;
    let id = app.engine.roles.ensure_role("Editors").await.unwrap();

    let err = app.engine.roles.rename_role(id, "member").await.unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    app.engine.roles.rename_role(id, "Reviewers").await.unwrap();
    let role = app.engine.roles.find_role("reviewers").await.unwrap();
    assert_eq!(role.id, id);
    assert_eq!(role.name, "Reviewers");

    let err = app.engine.roles.rename_role(9999, "Nobody").await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_membership_is_answerable_across_revocation() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    let t0 = app.now();
    assert!(app.engine.roles.assign(id, "Member", Some(t0)).await.unwrap());

    app.advance(Duration::days(3));
    let t1 = app.now();
    assert!(app.engine.roles.revoke(id, "Member", Some(t1)).await.unwrap());

    let roles = &app.engine.roles;
    let before = t0 - Duration::seconds(1);
    let during = t0 + Duration::days(1);

    assert!(!roles.effective_roles(id, Some(before)).await.unwrap().contains("Member"));
    assert!(roles.effective_roles(id, Some(t0)).await.unwrap().contains("Member"));
    assert!(roles.effective_roles(id, Some(during)).await.unwrap().contains("Member"));
    assert!(!roles.effective_roles(id, Some(t1)).await.unwrap().contains("Member"));
    assert!(!roles.is_in_role("alice", "member", None).await.unwrap());
    assert!(roles.is_in_role("alice", "member", Some(during)).await.unwrap());

    let mut conn = app.store.connection().await.unwrap();
    let live = RoleAssignmentRepository::find_live(&mut *conn, id).await.unwrap();
    let history = RoleAssignmentRepository::find_history(&mut *conn, id).await.unwrap();
    assert!(live.is_empty());
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].valid_from, t0);
    assert_eq!(history[0].valid_until, Some(t1));
}

#[tokio::test]
async fn test_assign_twice_is_a_no_op() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    assert!(app.engine.roles.assign(id, "Administrator", None).await.unwrap());
    app.advance(Duration::minutes(1));
    assert!(!app.engine.roles.assign(id, "administrator", None).await.unwrap());

    let live = app
        .count(
            "SELECT COUNT(*) AS n FROM account_roles WHERE account_id = ?",
            &[SqlValue::Int(id)],
        )
        .await;
    assert_eq!(live, 1);
}

#[tokio::test]
async fn test_revoke_without_membership_returns_false() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    assert!(!app.engine.roles.revoke(id, "Member", None).await.unwrap());
}

#[tokio::test]
async fn test_assign_unknown_role_or_account_is_not_found() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;

    let err = app.engine.roles.assign(id, "Ghosts", None).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let err = app.engine.roles.assign(4242, "Member", None).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_future_assignment_starts_later() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    let start = app.now() + Duration::days(7);

    assert!(app.engine.roles.assign(id, "All", Some(start)).await.unwrap());
    assert!(!app.engine.roles.is_in_role("alice", "All", None).await.unwrap());

    app.advance(Duration::days(8));
    assert!(app.engine.roles.is_in_role("alice", "All", None).await.unwrap());
}

#[tokio::test]
async fn test_unknown_user_holds_no_roles() {
    let app = TestApp::new().await;
    assert!(!app.engine.roles.is_in_role("ghost", "Member", None).await.unwrap());
}

#[tokio::test]
async fn test_earlier_assign_moves_later_one_back() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    let t0 = app.now();

    assert!(app.engine.roles.assign(id, "Member", Some(t0 + Duration::days(5))).await.unwrap());
    assert!(app.engine.roles.assign(id, "Member", Some(t0)).await.unwrap());

    {
        let mut conn = app.store.connection().await.unwrap();
        let live = RoleAssignmentRepository::find_live(&mut *conn, id).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].valid_from, t0);
        assert_eq!(live[0].valid_until, None);
    }

    app.advance(Duration::days(6));
    assert!(app.engine.roles.revoke(id, "Member", None).await.unwrap());
    assert!(!app.engine.roles.is_in_role("alice", "Member", None).await.unwrap());
    assert!(
        app.engine
            .roles
            .is_in_role("alice", "Member", Some(t0 + Duration::days(1)))
            .await
            .unwrap()
    );

    let mut conn = app.store.connection().await.unwrap();
    assert!(RoleAssignmentRepository::find_live(&mut *conn, id).await.unwrap().is_empty());
    let history = RoleAssignmentRepository::find_history(&mut *conn, id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].valid_from, t0);
}

#[tokio::test]
async fn test_assign_within_existing_interval_is_a_no_op() {
    let app = TestApp::new().await;
    let id = app.create_test_user("alice", PASSWORD).await;
    let t0 = app.now();

    assert!(app.engine.roles.assign(id, "Member", Some(t0)).await.unwrap());
    assert!(!app.engine.roles.assign(id, "Member", Some(t0 + Duration::days(2))).await.unwrap());

    let live = app
        .count(
            "SELECT COUNT(*) AS n FROM account_roles WHERE account_id = ?",
            &[SqlValue::Int(id)],
        )
        .await;
    assert_eq!(live, 1);

    app.advance(Duration::days(3));
    assert!(app.engine.roles.revoke(id, "Member", None).await.unwrap());
    assert!(!app.engine.roles.is_in_role("alice", "Member", None).await.unwrap());
}
