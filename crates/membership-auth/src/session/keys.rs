//! Signing key rotation and session issuance.
//!
//! Several keys may be valid at once. The newest signs new tokens; every
//! valid key is tried when verifying, so rotating in new keys does not
//! invalidate sessions signed with older ones until those keys expire.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use moka::future::Cache;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use membership_core::audit::{AuditCategory, AuditEvent};
use membership_core::config::SessionConfig;
use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::traits::{AuditSink, Clock, Store};
use membership_database::repositories::SigningKeyRepository;
use membership_entity::account::Account;
use membership_entity::session::{Session, SigningKey};

use crate::jwt::{SessionClaims, TokenSigner, TokenVerifier};

/// Length of generated key material in bytes.
pub const KEY_LENGTH: usize = 32;

const VALID_KEYS: &str = "valid";

/// Owns the signing keys and issues, verifies, and refreshes session tokens.
#[derive(Clone)]
pub struct SessionKeyManager {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    signer: TokenSigner,
    verifier: TokenVerifier,
    cache: Cache<&'static str, Arc<Vec<SigningKey>>>,
    /// Serializes key generation.
    generation: Arc<Mutex<()>>,
}

impl std::fmt::Debug for SessionKeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyManager")
            .field("config", &self.config)
            .finish()
    }
}

impl SessionKeyManager {
    /// Creates a new session key manager.
    pub fn new(
        store: Arc<dyn Store>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(StdDuration::from_secs(config.key_cache_ttl_seconds))
            .build();

        Self {
            store,
            audit,
            clock,
            config,
            signer: TokenSigner,
            verifier: TokenVerifier::new(),
            cache,
            generation: Arc::new(Mutex::new(())),
        }
    }

    /// Keys valid now, newest first. May be empty.
    pub async fn valid_keys(&self) -> AppResult<Arc<Vec<SigningKey>>> {
        let now = self.clock.now();

        if let Some(cached) = self.cache.get(VALID_KEYS).await {
            if cached.iter().all(|k| k.is_valid_at(now)) && !cached.is_empty() {
                return Ok(cached);
            }
        }

        let keys = {
            let mut conn = self.store.connection().await?;
            SigningKeyRepository::find_valid(&mut *conn, now).await?
        };

        let keys = Arc::new(keys);
        if !keys.is_empty() {
            self.cache.insert(VALID_KEYS, Arc::clone(&keys)).await;
        }
        Ok(keys)
    }

    /// Keys valid now, newest first, generating `count` fresh keys if none
    /// are valid.
    pub async fn get_or_create_active_keys(&self, count: usize) -> AppResult<Arc<Vec<SigningKey>>> {
        let keys = self.valid_keys().await?;
        if !keys.is_empty() {
            return Ok(keys);
        }

        let _guard = self.generation.lock().await;

        // Another task may have generated keys while we waited.
        let keys = self.valid_keys().await?;
        if !keys.is_empty() {
            return Ok(keys);
        }

        self.generate(count).await?;
        self.valid_keys().await
    }

    /// Generate and persist `count` new keys, leaving existing keys valid.
    pub async fn rotate_keys(&self, count: usize) -> AppResult<Vec<i64>> {
        let _guard = self.generation.lock().await;
        self.generate(count).await
    }

    async fn generate(&self, count: usize) -> AppResult<Vec<i64>> {
        if count == 0 {
            return Err(AppError::validation("At least one key must be generated"));
        }

        let now = self.clock.now();
        let valid_until = now + Duration::days(self.config.key_validity_days);

        let ids = {
            let mut uow = self.store.begin().await?;
            let mut ids = Vec::with_capacity(count);
            for _ in 0..count {
                let material: [u8; KEY_LENGTH] = rand::random();
                ids.push(SigningKeyRepository::insert(&mut *uow, &material, now, valid_until).await?);
            }
            uow.commit().await?;
            ids
        };

        self.cache.invalidate(VALID_KEYS).await;

        info!(count, valid_until = %valid_until, "Session signing keys generated");
        self.audit
            .emit(
                AuditEvent::success(AuditCategory::SessionKeys, "Session signing keys generated")
                    .with_detail("count", count as i64)
                    .with_detail("valid_until", valid_until.to_rfc3339()),
            )
            .await;
        Ok(ids)
    }

    /// Start a new session for `account` and sign it with the newest key.
    pub async fn issue_session(
        &self,
        account: &Account,
        temporary_password: bool,
    ) -> AppResult<(Session, String)> {
        let session = Session {
            logged_in: true,
            session_id: Uuid::new_v4().to_string(),
            account_id: account.id,
            username: account.username.clone(),
            name: account.name.clone(),
            surname: account.surname.clone(),
            temporary_password,
        };

        let token = self.sign(&session).await?;
        debug!(account_id = account.id, session_id = %session.session_id, "Session issued");
        Ok((session, token))
    }

    /// The session a token carries, if any valid key signed it and it has
    /// not expired.
    pub async fn verify_session(&self, token: &str) -> AppResult<Session> {
        let keys = self.valid_keys().await?;
        let claims = self.verifier.verify(token, &keys, self.clock.now())?;
        Ok(claims.into_session())
    }

    /// Re-sign an updated session snapshot with the newest key.
    pub async fn refresh_session(&self, session: &Session) -> AppResult<String> {
        if !session.logged_in {
            return Err(AppError::authentication("Session is not logged in"));
        }
        self.sign(session).await
    }

    async fn sign(&self, session: &Session) -> AppResult<String> {
        let keys = self
            .get_or_create_active_keys(self.config.keys_per_rotation)
            .await?;
        let key = keys
            .first()
            .ok_or_else(|| AppError::internal("No signing key available"))?;

        let now = self.clock.now();
        let claims = SessionClaims::new(session, now, now + Duration::hours(self.config.session_ttl_hours));
        self.signer.sign(&claims, key)
    }

    /// Session settings in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
