//! Cache-aside recap lookup.
//!
//! Per request: authenticate, try the cache, fall back to the store on a miss
//! or any cache failure, then populate the cache in the background. The cache
//! is only ever an optimization: every answer that does not come from a live
//! cache entry comes from the store.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use recap_auth::{AuthError, SignatureValidator};
use recap_storage::{RecapRecord, RecapStore, StoreError, effective_deadline};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, error, warn};

use crate::cache::{CacheError, CacheStore};
use crate::metrics::Metrics;

/// `operation` label of the store latency histogram.
pub const GET_USER_OPERATION: &str = "get_user";

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(2);

/// Failures of a recap lookup. Absence is not an error.
#[derive(Debug, thiserror::Error)]
pub enum RecapError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("request timeout")]
    Timeout,

    #[error("internal server error")]
    Internal(#[source] StoreError),
}

/// Result of a backend liveness probe.
#[derive(Debug)]
pub enum HealthFailure {
    Store {
        backend: &'static str,
        error: StoreError,
    },
    Cache {
        backend: &'static str,
        error: CacheError,
    },
}

pub struct RecapService {
    validator: SignatureValidator,
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn RecapStore>,
    metrics: Arc<Metrics>,
    cache_ttl: Duration,
    cache_read_timeout: Duration,
    cache_write_timeout: Duration,
}

impl RecapService {
    pub fn new(
        validator: SignatureValidator,
        cache: Arc<dyn CacheStore>,
        store: Arc<dyn RecapStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            validator,
            cache,
            store,
            metrics,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_read_timeout: DEFAULT_CACHE_TIMEOUT,
            cache_write_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }

    /// Lifetime of entries written after a store hit.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Upper bound on a cache read, on top of the request deadline.
    pub fn with_cache_read_timeout(mut self, timeout: Duration) -> Self {
        self.cache_read_timeout = timeout;
        self
    }

    /// Upper bound on the background cache write.
    pub fn with_cache_write_timeout(mut self, timeout: Duration) -> Self {
        self.cache_write_timeout = timeout;
        self
    }

    pub fn cache_name(&self) -> &'static str {
        self.cache.name()
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Authenticates the request and returns the caller's recap.
    ///
    /// `Ok(None)` means the user has no recap row. Authentication failures
    /// return before any cache or store access.
    pub async fn get_recap(
        &self,
        headers: &HeaderMap,
        deadline: Option<Instant>,
    ) -> Result<Option<RecapRecord>, RecapError> {
        let user_id = self.validator.validate(headers).inspect_err(|e| {
            debug!(reason = e.kind(), "request authentication failed");
        })?;
        self.get_recap_for(user_id, deadline).await
    }

    /// Cache-aside lookup for an already authenticated user.
    pub async fn get_recap_for(
        &self,
        user_id: u32,
        deadline: Option<Instant>,
    ) -> Result<Option<RecapRecord>, RecapError> {
        if let Some(record) = self.read_cache(user_id, deadline).await {
            self.metrics.record_cache_hit(self.cache.name());
            return Ok(Some(record));
        }
        self.metrics.record_cache_miss(self.cache.name());

        let started = Instant::now();
        match self.store.fetch_recap(user_id, deadline).await {
            Ok(Some(record)) => {
                self.metrics
                    .record_store_query(GET_USER_OPERATION, started.elapsed());
                self.populate_cache(user_id, record.clone());
                Ok(Some(record))
            }
            Ok(None) => {
                self.metrics
                    .record_store_query(GET_USER_OPERATION, started.elapsed());
                debug!(user_id, "no recap for user");
                Ok(None)
            }
            Err(e) if e.is_timeout() => {
                warn!(user_id, "recap store lookup timed out");
                Err(RecapError::Timeout)
            }
            Err(e) => {
                error!(user_id, error = %e, "recap store lookup failed");
                Err(RecapError::Internal(e))
            }
        }
    }

    /// Pings the store, then the cache. Reports the first failure.
    pub async fn check_health(&self) -> Result<(), HealthFailure> {
        self.store
            .ping()
            .await
            .map_err(|error| HealthFailure::Store {
                backend: self.store.name(),
                error,
            })?;
        self.cache
            .ping()
            .await
            .map_err(|error| HealthFailure::Cache {
                backend: self.cache.name(),
                error,
            })?;
        Ok(())
    }

    // Any failure, timeout included, is reported as a miss.
    async fn read_cache(&self, user_id: u32, deadline: Option<Instant>) -> Option<RecapRecord> {
        let read_by = effective_deadline(deadline, self.cache_read_timeout);
        let result = match timeout_at(read_by, self.cache.get(user_id)).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        };
        match result {
            Ok(found) => found,
            Err(e) => {
                warn!(user_id, cache = self.cache.name(), error = %e, "recap cache read failed");
                None
            }
        }
    }

    // Detached from the request: the write may finish after the response is
    // sent, and is bounded only by the cache write timeout.
    fn populate_cache(&self, user_id: u32, record: RecapRecord) {
        let cache = Arc::clone(&self.cache);
        let ttl = self.cache_ttl;
        let write_timeout = self.cache_write_timeout;

        tokio::spawn(async move {
            match timeout(write_timeout, cache.set(user_id, &record, ttl)).await {
                Ok(Ok(())) => debug!(user_id, "recap cached"),
                Ok(Err(e)) => {
                    warn!(user_id, cache = cache.name(), error = %e, "recap cache write failed");
                }
                Err(_) => warn!(user_id, cache = cache.name(), "recap cache write timed out"),
            }
        });
    }
}

impl std::fmt::Debug for RecapService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecapService")
            .field("validator", &self.validator)
            .field("cache", &self.cache.name())
            .field("store", &self.store.name())
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}
