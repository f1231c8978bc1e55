//! Recap HTTP server.
//!
//! Serves per-user recap summaries with cache-aside reads: signed requests are
//! answered from Redis (or the in-process fallback cache) when possible and
//! from PostgreSQL otherwise.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod service;

pub use cache::{CacheError, CacheStore, LocalCache, RedisCache, create_cache, recap_key};
pub use config::{AppConfig, CacheConfig, PostgresStorageConfig, RedisConfig, ServerConfig};
pub use error::ApiError;
pub use metrics::Metrics;
pub use observability::init_tracing;
pub use server::{AppState, RecapServer, ServerBuilder, build_app};
pub use service::{RecapError, RecapService};
