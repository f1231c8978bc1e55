//! In-process recap cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use recap_storage::RecapRecord;

use super::{CacheError, CacheStore, decode, encode, recap_key};

/// Expired entries are swept on insert once the map grows past this size.
const SWEEP_THRESHOLD: usize = 10_000;

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Single-instance cache backed by a `DashMap`.
///
/// Entries are stored encoded, the same way Redis holds them.
#[derive(Clone, Default)]
pub struct LocalCache {
    entries: Arc<DashMap<String, CachedEntry>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }
}

#[async_trait]
impl CacheStore for LocalCache {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, user_id: u32) -> Result<Option<RecapRecord>, CacheError> {
        let key = recap_key(user_id);
        let data = match self.entries.get(&key) {
            Some(entry) if !entry.is_expired() => Arc::clone(&entry.data),
            Some(entry) => {
                drop(entry);
                self.entries.remove(&key);
                return Ok(None);
            }
            None => return Ok(None),
        };
        decode(&data).map(Some)
    }

    async fn set(
        &self,
        user_id: u32,
        record: &RecapRecord,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let data = encode(record)?;
        if self.entries.len() >= SWEEP_THRESHOLD {
            self.purge_expired();
        }
        self.entries
            .insert(recap_key(user_id), CachedEntry::new(data, ttl));
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
