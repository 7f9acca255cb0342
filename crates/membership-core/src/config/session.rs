//! Session key and token configuration.

use serde::{Deserialize, Serialize};

/// Signing key rotation and session token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Validity window of freshly generated signing keys, in days.
    #[serde(default = "default_key_validity_days")]
    pub key_validity_days: i64,
    /// Number of keys generated per rotation.
    #[serde(default = "default_keys_per_rotation")]
    pub keys_per_rotation: usize,
    /// How long the set of valid keys is cached before being re-read.
    #[serde(default = "default_key_cache_ttl")]
    pub key_cache_ttl_seconds: u64,
    /// Lifetime of an issued session token, in hours.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
    /// Name of the cookie carrying the session token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_validity_days: default_key_validity_days(),
            keys_per_rotation: default_keys_per_rotation(),
            key_cache_ttl_seconds: default_key_cache_ttl(),
            session_ttl_hours: default_session_ttl(),
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_key_validity_days() -> i64 {
    30
}

fn default_keys_per_rotation() -> usize {
    2
}

fn default_key_cache_ttl() -> u64 {
    60
}

fn default_session_ttl() -> i64 {
    12
}

fn default_cookie_name() -> String {
    "membership-session".to_string()
}
