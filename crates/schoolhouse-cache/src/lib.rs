//! # Schoolhouse Cache
//!
//! Redis-backed caching for the expensive report endpoints (schedule
//! analysis, immunization compliance).
//!
//! The cache is optional: when Redis is unreachable at startup the service
//! runs without it, and read failures are treated as misses.
//!
//! ```ignore
//! use schoolhouse_cache::{CacheConfig, RedisCache, keys};
//!
//! let cache = RedisCache::new(&CacheConfig::from_env()).await?;
//! let key = keys::scheduling::health(school_id, year_id);
//! cache.set(&key, &report).await?;
//! let cached: Option<ScheduleHealth> = cache.get(&key).await;
//! ```

pub mod config;
pub mod keys;
pub mod redis;

pub use config::CacheConfig;
pub use keys::{hash_filters, invalidate};
pub use redis::{CacheError, RedisCache};
