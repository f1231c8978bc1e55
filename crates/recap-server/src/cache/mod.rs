//! Recap cache backends.
//!
//! Entries are the JSON form of [`RecapRecord`], keyed
//! `user:recap:<decimal user id>`. Two backends implement [`CacheStore`]:
//!
//! - [`RedisCache`]: shared across instances, TTL enforced by Redis
//! - [`LocalCache`]: in-process `DashMap`, used when Redis is disabled or
//!   unreachable at startup

mod local;
mod redis_cache;

pub use local::{CachedEntry, LocalCache};
pub use redis_cache::RedisCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use recap_db_postgres::mask_password;
use recap_storage::RecapRecord;

use crate::config::RedisConfig;

/// Namespace prefix of every recap cache key.
pub const CACHE_KEY_PREFIX: &str = "user:recap:";

/// Cache failures. The service treats all of them as a miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection unavailable: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("cache command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("cache entry could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("cache entry could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("cache operation timed out")]
    Timeout,
}

/// Key/value store for recap records with a fixed time-to-live.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name used as the `cache` metrics label.
    fn name(&self) -> &'static str;

    /// Returns the cached record, or `None` if absent or expired.
    async fn get(&self, user_id: u32) -> Result<Option<RecapRecord>, CacheError>;

    /// Stores `record` under `user_id`, replacing any existing entry.
    async fn set(&self, user_id: u32, record: &RecapRecord, ttl: Duration)
    -> Result<(), CacheError>;

    /// Lightweight liveness check.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Builds the cache key for a user.
pub fn recap_key(user_id: u32) -> String {
    format!("{CACHE_KEY_PREFIX}{user_id}")
}

pub(crate) fn encode(record: &RecapRecord) -> Result<Vec<u8>, CacheError> {
    serde_json::to_vec(record).map_err(CacheError::Encode)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<RecapRecord, CacheError> {
    serde_json::from_slice(bytes).map_err(CacheError::Decode)
}

/// Creates the cache backend from configuration.
///
/// Falls back to [`LocalCache`] when Redis is disabled, when the pool cannot
/// be built, or when no connection can be opened at startup.
pub async fn create_cache(config: &RedisConfig) -> Arc<dyn CacheStore> {
    if !config.enabled {
        tracing::info!("Redis disabled, using local recap cache");
        return Arc::new(LocalCache::new());
    }

    tracing::info!(url = %mask_password(&config.url), "Connecting to Redis");

    let timeout = Duration::from_millis(config.timeout_ms);
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return Arc::new(LocalCache::new());
        }
    };

    match pool.get().await {
        Ok(_) => {
            let cache = RedisCache::new(pool);
            tracing::info!(
                max_size = cache.pool().status().max_size,
                "Connected to Redis"
            );
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            Arc::new(LocalCache::new())
        }
    }
}
