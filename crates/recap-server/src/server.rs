use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use recap_auth::SignatureValidator;
use recap_db_postgres::{PgRecapStore, mask_password};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    cache::create_cache,
    config::AppConfig,
    handlers,
    metrics::Metrics,
    middleware::{self as app_middleware, RequestId},
    service::RecapService,
};

/// How often the Prometheus exporter drains histogram buckets.
const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecapService>,
    pub metrics: Arc<Metrics>,
    /// Deadline applied to each recap lookup.
    pub request_timeout: Duration,
    /// Hard limit on any request, answered with 408.
    pub transport_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<RecapService>, metrics: Arc<Metrics>, request_timeout: Duration) -> Self {
        Self {
            service,
            metrics,
            request_timeout,
            transport_timeout: request_timeout * 2,
        }
    }

    pub fn with_transport_timeout(mut self, timeout: Duration) -> Self {
        self.transport_timeout = timeout;
        self
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/user-data", get(handlers::get_user_data))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TimeoutLayer::new(state.transport_timeout))
        .layer(middleware::from_fn(app_middleware::timeout_body))
        // Route-level so the metrics middleware sees the matched path.
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.metrics),
            app_middleware::track_metrics,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let req_id = req
                        .extensions()
                        .get::<RequestId>()
                        .map(|id| id.as_str().to_string())
                        .unwrap_or_default();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = tracing::field::Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        // Outermost, so the trace span can read the id.
        .layer(middleware::from_fn(app_middleware::request_id))
        .with_state(state)
}

pub struct RecapServer {
    addr: SocketAddr,
    app: Router,
    metrics: Arc<Metrics>,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connects the store and cache and assembles the router.
    pub async fn build(self) -> anyhow::Result<RecapServer> {
        let cfg = &self.config;

        let metrics = Arc::new(
            Metrics::new(&cfg.server.service_name)
                .context("failed to build Prometheus recorder")?,
        );

        let pg = cfg.storage.postgres.to_store_config();
        tracing::info!(url = %mask_password(&pg.url), "Connecting to PostgreSQL");
        let store = Arc::new(
            PgRecapStore::new(&pg)
                .await
                .context("failed to initialize PostgreSQL store")?,
        );

        let cache = create_cache(&cfg.redis).await;
        let validator = SignatureValidator::new(cfg.auth.signature_secret.clone());
        if !validator.has_secret() {
            tracing::warn!("auth.signature_secret is not set; signatures cover only timestamp and user id");
        }

        let service = RecapService::new(validator, cache, store, Arc::clone(&metrics))
            .with_cache_ttl(cfg.cache.ttl())
            .with_cache_read_timeout(Duration::from_millis(cfg.redis.timeout_ms))
            .with_cache_write_timeout(cfg.cache.write_timeout());
        tracing::debug!(?service, "recap service ready");

        let state = AppState::new(
            Arc::new(service),
            Arc::clone(&metrics),
            cfg.request_timeout(),
        )
        .with_transport_timeout(cfg.transport_timeout());
        let app = build_app(state);

        Ok(RecapServer {
            addr: self.addr,
            app,
            metrics,
        })
    }
}

impl RecapServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);

        let upkeep = spawn_metrics_upkeep(Arc::clone(&self.metrics));
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        upkeep.abort();
        served?;
        Ok(())
    }
}

pub fn spawn_metrics_upkeep(metrics: Arc<Metrics>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            metrics.run_upkeep();
        }
    })
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
