//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use membership_core::audit::{AuditCategory, AuditEvent, AuditStatus};
use membership_core::config::{AppConfig, HashingConfig};
use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, Clock, ManualClock, SqlExecutor, Store, UnitOfWork};
use membership_core::types::{SqlRow, SqlValue};
use membership_database::SqlStore;
use membership_database::repositories::PolicyRepository;
use membership_entity::policy::keys::PASSWORD_RULES;
use membership_service::MembershipEngine;
use membership_service::account::{LoginResponse, RegisterRequest, RegisterResponse};

/// A password that satisfies the default rules.
pub const PASSWORD: &str = "Tiger#91x";

/// Further passwords that satisfy the default rules, all different.
pub const PASSWORDS: [&str; 7] = [
    "Falcon$72q",
    "Orbit!58kz",
    "Maple%34wn",
    "Cedar&16jv",
    "Piano*29tm",
    "Lemon^83rd",
    "Quartz@47b",
];

/// Source address used for logins.
pub const IP: &str = "10.0.0.1";

/// Audit sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    /// Every event recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events of one category and status.
    pub fn find(&self, category: AuditCategory, status: AuditStatus) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.category == category && e.status == status)
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: &AuditEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Store that refuses every statement containing `fragment`, passing
/// everything else through to the wrapped store.
#[derive(Debug)]
pub struct FailingStore {
    inner: Arc<SqlStore>,
    fragment: String,
}

impl FailingStore {
    pub fn new(inner: Arc<SqlStore>, fragment: &str) -> Self {
        Self {
            inner,
            fragment: fragment.to_string(),
        }
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(Failing {
            inner: self.inner.begin().await?,
            fragment: self.fragment.clone(),
        }))
    }

    async fn connection(&self) -> AppResult<Box<dyn SqlExecutor>> {
        Ok(Box::new(Failing {
            inner: self.inner.connection().await?,
            fragment: self.fragment.clone(),
        }))
    }
}

struct Failing<T: ?Sized> {
    inner: Box<T>,
    fragment: String,
}

#[async_trait]
impl<T: SqlExecutor + ?Sized> SqlExecutor for Failing<T> {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> AppResult<u64> {
        if sql.contains(&self.fragment) {
            return Err(AppError::database(format!("refused: {}", self.fragment)));
        }
        self.inner.execute(sql, params).await
    }

    async fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<SqlRow>> {
        self.inner.fetch_all(sql, params).await
    }
}

#[async_trait]
impl UnitOfWork for Failing<dyn UnitOfWork> {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.inner.rollback().await
    }
}

/// The engine over a fresh in-memory store, with a frozen clock.
pub struct TestApp {
    /// All components
    pub engine: MembershipEngine,
    /// The store, for direct queries
    pub store: Arc<SqlStore>,
    /// The clock every component reads
    pub clock: Arc<ManualClock>,
    /// Every audit event emitted
    pub audit: Arc<RecordingAuditSink>,
    /// Configuration the engine was built with
    pub config: AppConfig,
}

impl TestApp {
    /// Create a new migrated and seeded test application
    pub async fn new() -> Self {
        let mut config = AppConfig::with_database_url("sqlite::memory:");
        config.auth.hashing = HashingConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        };
        config.auth.policy_cache_ttl_seconds = 3600;

        let store = Arc::new(
            SqlStore::connect(&config.database)
                .await
                .expect("Failed to open in-memory store"),
        );
        membership_database::migration::run_migrations(store.as_ref(), store.dialect())
            .await
            .expect("Failed to run migrations");
        membership_database::seed::seed_defaults(store.as_ref())
            .await
            .expect("Failed to seed defaults");

        let clock = Arc::new(ManualClock::new(start_time()));
        let audit = Arc::new(RecordingAuditSink::default());

        let engine = MembershipEngine::new(
            store.clone() as Arc<dyn Store>,
            audit.clone() as Arc<dyn AuditSink>,
            clock.clone() as Arc<dyn Clock>,
            &config,
        )
        .expect("Failed to build engine");

        Self {
            engine,
            store,
            clock,
            audit,
            config,
        }
    }

    /// Current time of the test clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Move the test clock forward
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Override one password rule and drop the cached group
    pub async fn set_rule(&self, key: &str, value: i64) {
        {
            let mut conn = self.store.connection().await.unwrap();
            PolicyRepository::upsert(&mut *conn, PASSWORD_RULES, key, &value.to_string())
                .await
                .unwrap();
        }
        self.engine.policy.invalidate(PASSWORD_RULES).await;
    }

    /// Register and activate a user; returns the account ID
    pub async fn create_test_user(&self, username: &str, password: &str) -> i64 {
        let response = self
            .engine
            .accounts
            .register(register_request(username, password))
            .await
            .expect("Registration failed");
        let RegisterResponse::Registered { account_id } = response else {
            panic!("Password rejected for {username}: {response:?}");
        };
        self.engine.accounts.activate(account_id).await.unwrap();
        account_id
    }

    /// Log in from [`IP`]
    pub async fn login(&self, username: &str, password: &str) -> LoginResponse {
        self.engine
            .accounts
            .login(username, password, IP)
            .await
            .expect("Login errored")
    }

    /// Log in and return the session token, panicking on refusal
    pub async fn login_token(&self, username: &str, password: &str) -> String {
        match self.login(username, password).await {
            LoginResponse::Success { token, .. } => token,
            LoginResponse::Failure { message } => panic!("Login refused: {message}"),
        }
    }

    /// Run a `SELECT COUNT(*) AS n ...` statement
    pub async fn count(&self, sql: &str, params: &[SqlValue]) -> i64 {
        let mut conn = self.store.connection().await.unwrap();
        conn.fetch_one(sql, params).await.unwrap().i64("n").unwrap()
    }
}

/// Registration input with matching confirmation
pub fn register_request(username: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        password: password.to_string(),
        confirm_password: password.to_string(),
        name: "Test".to_string(),
        surname: "User".to_string(),
        email: format!("{username}@example.com"),
    }
}

/// Fixed start instant for every test clock
pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-05T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}
