use std::sync::Arc;

use schoolhouse_cache::{CacheConfig, RedisCache};
use schoolhouse_config::{CorsConfig, JwtConfig, RateLimitConfig};
use schoolhouse_db::{PgPool, init_db_pool};
use tracing::{info, warn};

use crate::middleware::rate_limit::RateLimiters;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    /// `None` when Redis is not configured or unreachable
    pub cache: Option<RedisCache>,
    pub rate_limiters: Arc<RateLimiters>,
}

impl AppState {
    /// Builds a state around an existing pool, without Redis.
    pub fn new(db: PgPool, jwt_config: JwtConfig) -> Self {
        let rate_limit_config = RateLimitConfig::from_env();
        Self {
            db,
            jwt_config,
            cors_config: CorsConfig::from_env(),
            rate_limiters: Arc::new(RateLimiters::new(&rate_limit_config)),
            rate_limit_config,
            cache: None,
        }
    }

    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_ref()
    }
}

pub async fn init_app_state() -> AppState {
    let rate_limit_config = RateLimitConfig::from_env();

    AppState {
        db: init_db_pool().await,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        rate_limiters: Arc::new(RateLimiters::new(&rate_limit_config)),
        rate_limit_config,
        cache: init_cache().await,
    }
}

async fn init_cache() -> Option<RedisCache> {
    if std::env::var("REDIS_URL").is_err() {
        info!("REDIS_URL not set, report caching disabled");
        return None;
    }

    match RedisCache::new(&CacheConfig::from_env()).await {
        Ok(cache) => {
            info!("Connected to Redis");
            Some(cache)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Redis, continuing without cache");
            None
        }
    }
}
