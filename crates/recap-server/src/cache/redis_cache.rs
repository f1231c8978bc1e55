//! Redis-backed recap cache.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use recap_storage::RecapRecord;
use redis::AsyncCommands;

use super::{CacheError, CacheStore, decode, encode, recap_key};

/// Cache shared by every instance; expiry is enforced by Redis (`SET EX`).
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, user_id: u32) -> Result<Option<RecapRecord>, CacheError> {
        let key = recap_key(user_id);
        let mut conn = self.pool.get().await?;
        match conn.get::<_, Option<Vec<u8>>>(&key).await? {
            Some(data) => {
                tracing::debug!(key = %key, "cache hit");
                decode(&data).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        user_id: u32,
        record: &RecapRecord,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = recap_key(user_id);
        let data = encode(record)?;
        // SET EX rejects a zero expiry.
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(&key, data, ttl_secs).await?;
        tracing::debug!(key = %key, ttl_secs, "cache set");
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
