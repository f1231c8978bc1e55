//! Shared fixtures for the HTTP integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use recap_auth::{SignatureValidator, compute_signature};
use recap_server::{AppState, CacheError, CacheStore, LocalCache, Metrics, RecapService, build_app};
use recap_storage::{RecapRecord, RecapStore, StoreError};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const SECRET: &str = "s3cr3t";

/// How the stub store answers every lookup.
#[derive(Clone, Copy, Debug)]
pub enum StoreMode {
    Rows,
    /// Waits for the caller's deadline, then reports a timeout.
    HonorDeadline,
    /// Never answers, whatever the deadline.
    Hang,
    Broken,
}

/// In-memory store that counts lookups.
pub struct StubStore {
    rows: HashMap<u32, RecapRecord>,
    mode: StoreMode,
    calls: AtomicUsize,
}

impl StubStore {
    pub fn new(mode: StoreMode) -> Self {
        Self {
            rows: HashMap::new(),
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_row(mut self, user_id: u32, record: RecapRecord) -> Self {
        self.rows.insert(user_id, record);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecapStore for StubStore {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_recap(
        &self,
        user_id: u32,
        deadline: Option<Instant>,
    ) -> Result<Option<RecapRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            StoreMode::Rows => Ok(self.rows.get(&user_id).cloned()),
            StoreMode::HonorDeadline => {
                let deadline = deadline.ok_or_else(|| StoreError::query("no deadline"))?;
                tokio::time::sleep_until(deadline).await;
                Err(StoreError::Timeout)
            }
            StoreMode::Hang => std::future::pending().await,
            StoreMode::Broken => Err(StoreError::connection("connection refused")),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self.mode {
            StoreMode::Broken => Err(StoreError::connection("connection refused")),
            _ => Ok(()),
        }
    }
}

/// Cache whose reads and/or writes always fail.
pub struct FailingCache {
    pub fail_reads: bool,
    pub fail_writes: bool,
    inner: LocalCache,
    writes: AtomicUsize,
}

impl FailingCache {
    pub fn new(fail_reads: bool, fail_writes: bool) -> Self {
        Self {
            fail_reads,
            fail_writes,
            inner: LocalCache::new(),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for FailingCache {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, user_id: u32) -> Result<Option<RecapRecord>, CacheError> {
        if self.fail_reads {
            return Err(CacheError::Timeout);
        }
        self.inner.get(user_id).await
    }

    async fn set(
        &self,
        user_id: u32,
        record: &RecapRecord,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(CacheError::Timeout);
        }
        self.inner.set(user_id, record, ttl).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        if self.fail_reads {
            return Err(CacheError::Timeout);
        }
        Ok(())
    }
}

/// Cache whose reads never complete. Writes succeed.
pub struct HungCache;

#[async_trait]
impl CacheStore for HungCache {
    fn name(&self) -> &'static str {
        "hung"
    }

    async fn get(&self, _user_id: u32) -> Result<Option<RecapRecord>, CacheError> {
        std::future::pending().await
    }

    async fn set(
        &self,
        _user_id: u32,
        _record: &RecapRecord,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

pub struct TestServer {
    pub base: String,
    pub metrics: Arc<Metrics>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

pub fn test_metrics() -> Arc<Metrics> {
    Arc::new(Metrics::new("recap-test").expect("metrics"))
}

pub fn test_service(
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn RecapStore>,
    metrics: &Arc<Metrics>,
) -> RecapService {
    RecapService::new(
        SignatureValidator::new(Some(SECRET.into())),
        cache,
        store,
        Arc::clone(metrics),
    )
    .with_cache_ttl(Duration::from_secs(60))
}

pub async fn start_server(
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn RecapStore>,
    request_timeout: Duration,
) -> TestServer {
    let metrics = test_metrics();
    let service = test_service(cache, store, &metrics);
    start_app(AppState::new(
        Arc::new(service),
        Arc::clone(&metrics),
        request_timeout,
    ))
    .await
}

pub async fn start_app(state: AppState) -> TestServer {
    let metrics = Arc::clone(&state.metrics);
    let app = build_app(state);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        metrics,
        shutdown: Some(tx),
        handle: Some(handle),
    }
}

pub fn now_timestamp() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap()
}

/// Sends `GET /api/user-data` signed with [`SECRET`].
pub async fn get_signed(base: &str, user_id: &str) -> reqwest::Response {
    let ts = now_timestamp();
    get_with(base, &ts, user_id, &compute_signature(&ts, user_id, Some(SECRET))).await
}

pub async fn get_with(base: &str, ts: &str, user_id: &str, sign: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("{base}/api/user-data"))
        .header("timestamp", ts)
        .header("user_id", user_id)
        .header("sign", sign)
        .send()
        .await
        .unwrap()
}

/// Polls until the background cache write lands.
pub async fn wait_for_entry(cache: &dyn CacheStore, user_id: u32) -> RecapRecord {
    for _ in 0..200 {
        if let Ok(Some(record)) = cache.get(user_id).await {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("cache entry for {user_id} never appeared");
}

pub fn sample_record() -> RecapRecord {
    RecapRecord {
        total_point: None,
        cheaper_subs_amount: Some(15000.5),
        list_circular_images: Some(vec!["a.png".into()]),
        ..RecapRecord::new("alice", 7)
    }
}
