//! Store configuration.

use std::time::Duration;

/// Configuration for the Redis-backed ledgers.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL
    pub redis_url: String,
    /// Prefix for every key written by the store
    pub key_prefix: String,
    /// Lifetime of a pending account-linking state token
    pub oauth_state_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "sclip".to_string(),
            oauth_state_ttl: Duration::from_secs(600), // 10 minutes
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("STORE_KEY_PREFIX").unwrap_or_else(|_| "sclip".to_string()),
            oauth_state_ttl: Duration::from_secs(
                std::env::var("OAUTH_STATE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}
