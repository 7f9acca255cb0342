//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Credential policy and hashing configuration.
///
/// The password rules themselves live in the store (parameter group
/// [`AuthConfig::policy_group`]); this section only says where to find
/// them and how long to cache them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Parameter group holding the password rules.
    #[serde(default = "default_policy_group")]
    pub policy_group: String,
    /// How long a loaded parameter group is cached before being re-read.
    #[serde(default = "default_policy_cache_ttl")]
    pub policy_cache_ttl_seconds: u64,
    /// Argon2 cost parameters.
    #[serde(default)]
    pub hashing: HashingConfig,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Memory cost in KiB.
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Number of passes.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Degree of parallelism.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            policy_group: default_policy_group(),
            policy_cache_ttl_seconds: default_policy_cache_ttl(),
            hashing: HashingConfig::default(),
        }
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

fn default_policy_group() -> String {
    "password-rules".to_string()
}

fn default_policy_cache_ttl() -> u64 {
    30
}

fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}
