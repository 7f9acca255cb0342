//! Cached loading of parameter groups.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use membership_core::error::AppError;
use membership_core::result::AppResult;
use membership_core::traits::Store;
use membership_database::repositories::PolicyRepository;

use super::rules::PasswordRules;

/// Loads named parameter groups from the store.
///
/// Groups are cached for a short time so rule changes take effect without
/// a restart.
#[derive(Clone)]
pub struct PolicyStore {
    store: Arc<dyn Store>,
    cache: Cache<String, Arc<HashMap<String, String>>>,
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore")
            .field("cached_groups", &self.cache.entry_count())
            .finish()
    }
}

impl PolicyStore {
    /// Create a policy store caching groups for `ttl`.
    pub fn new(store: Arc<dyn Store>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(ttl)
            .build();
        Self { store, cache }
    }

    /// Every parameter of `group` as a flat mapping.
    ///
    /// An empty or unknown group is `NotFound`.
    pub async fn load_group(&self, group: &str) -> AppResult<Arc<HashMap<String, String>>> {
        if let Some(hit) = self.cache.get(group).await {
            return Ok(hit);
        }

        let params = {
            let mut conn = self.store.connection().await?;
            PolicyRepository::find_group(&mut *conn, group).await?
        };

        if params.is_empty() {
            return Err(AppError::not_found(format!(
                "Parameter group '{group}' not found"
            )));
        }

        let map: HashMap<String, String> = params.into_iter().map(|p| (p.key, p.value)).collect();
        debug!(group = %group, parameters = map.len(), "Parameter group loaded");

        let map = Arc::new(map);
        self.cache.insert(group.to_string(), Arc::clone(&map)).await;
        Ok(map)
    }

    /// The typed password rules held in `group`.
    pub async fn password_rules(&self, group: &str) -> AppResult<PasswordRules> {
        let params = self.load_group(group).await?;
        Ok(PasswordRules::from_params(&params))
    }

    /// Drop a cached group so the next load reads the store.
    pub async fn invalidate(&self, group: &str) {
        self.cache.invalidate(group).await;
    }
}
