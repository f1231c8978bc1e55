//! Prometheus metrics for the recap server.
//!
//! The recorder is owned by a [`Metrics`] value and is never installed as the
//! process-wide recorder. Every recording goes through
//! [`metrics::with_local_recorder`], so two `Metrics` values (two test
//! servers in one process, for instance) never share series.
//!
//! Series:
//! - `http_requests_total{method,route,status}`
//! - `http_request_duration_seconds{method,route,status}`
//! - `cache_hits_total{cache}` / `cache_misses_total{cache}`
//! - `db_query_duration_seconds{operation}`

use metrics::{counter, histogram, with_local_recorder};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::time::Duration;

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    // Cache metrics
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";

    // Store metrics
    pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";
}

/// Histogram buckets, in seconds.
pub const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.2, 0.5, 1.0];

/// Content type of the text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Metrics sink injected into the service and the router.
pub struct Metrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Metrics {
    /// Builds a recorder with a global `service` label.
    pub fn new(service_name: &str) -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .add_global_label("service", service_name)
            .set_buckets(DURATION_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();
        Ok(Self { recorder, handle })
    }

    /// Record an HTTP request.
    ///
    /// `route` should be the matched route template, not the raw path.
    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        let method = method.to_string();
        let route = route.to_string();
        let status = status.to_string();
        with_local_recorder(&self.recorder, || {
            counter!(
                names::HTTP_REQUESTS_TOTAL,
                "method" => method.clone(),
                "route" => route.clone(),
                "status" => status.clone()
            )
            .increment(1);

            histogram!(
                names::HTTP_REQUEST_DURATION_SECONDS,
                "method" => method,
                "route" => route,
                "status" => status
            )
            .record(duration.as_secs_f64());
        });
    }

    pub fn record_cache_hit(&self, cache: &'static str) {
        with_local_recorder(&self.recorder, || {
            counter!(names::CACHE_HITS_TOTAL, "cache" => cache).increment(1);
        });
    }

    pub fn record_cache_miss(&self, cache: &'static str) {
        with_local_recorder(&self.recorder, || {
            counter!(names::CACHE_MISSES_TOTAL, "cache" => cache).increment(1);
        });
    }

    /// Record the duration of a completed store query.
    pub fn record_store_query(&self, operation: &'static str, duration: Duration) {
        with_local_recorder(&self.recorder, || {
            histogram!(names::DB_QUERY_DURATION_SECONDS, "operation" => operation)
                .record(duration.as_secs_f64());
        });
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Drains histogram buckets; call periodically.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
