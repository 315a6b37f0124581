use std::env;

/// Redis cache configuration.
///
/// - `REDIS_URL`: connection URL (default `redis://127.0.0.1:6379`)
/// - `CACHE_TTL_SECONDS`: default TTL (default 300)
/// - `CACHE_PREFIX`: prefix for every key (default `schoolhouse`)
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub redis_url: String,
    pub default_ttl_seconds: u64,
    pub key_prefix: String,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            default_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl_seconds),
            key_prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.key_prefix),
        }
    }

    /// `"<prefix>:<key>"`
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".into(),
            default_ttl_seconds: 300,
            key_prefix: "schoolhouse".into(),
        }
    }
}
