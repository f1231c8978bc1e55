//! PostgreSQL implementation of the `RecapStore` trait.

use std::time::Duration;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_postgres::PgPool;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, instrument, warn};

use recap_storage::{RecapRecord, RecapStore, StoreError, effective_deadline};

use crate::config::PostgresConfig;
use crate::error::{Result, classify};
use crate::migrations;
use crate::pool;
use crate::row::RecapRow;

/// Lookup by exact user id. `cheaper_subs_amount` is NUMERIC in the table
/// and is read as float8.
pub const FETCH_RECAP_SQL: &str = r#"
SELECT
  user_id,
  user_name,
  trx_count,
  variant_count,
  total_point,
  total_point_description,
  total_point_possible_redeem,
  total_point_image,
  delivery_count,
  pickup_count,
  cheaper_subs_desc,
  cheaper_subs_amount::float8 AS cheaper_subs_amount,
  top_ranking,
  list_circular_images,
  list_product_favorite,
  list_favorite_store
FROM user_recap_data
WHERE user_id = $1
"#;

/// PostgreSQL-backed recap store.
#[derive(Debug, Clone)]
pub struct PgRecapStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgRecapStore {
    /// Creates a store with its own connection pool.
    ///
    /// Runs the embedded migrations first when `run_migrations` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or a migration fails.
    pub async fn new(config: &PostgresConfig) -> Result<Self> {
        let pool = pool::create_pool(config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self::from_pool(
            pool,
            Duration::from_millis(config.query_timeout_ms),
        ))
    }

    /// Creates a store over an existing connection pool.
    ///
    /// Migrations are not run when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecapStore for PgRecapStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self, deadline))]
    async fn fetch_recap(
        &self,
        user_id: u32,
        deadline: Option<Instant>,
    ) -> std::result::Result<Option<RecapRecord>, StoreError> {
        let deadline = effective_deadline(deadline, self.query_timeout);

        let lookup = query(FETCH_RECAP_SQL)
            .bind(i64::from(user_id))
            .fetch_optional(&self.pool);

        let row = match timeout_at(deadline, lookup).await {
            Ok(result) => result.map_err(classify)?,
            Err(_) => {
                warn!(user_id, "recap query exceeded its deadline");
                return Err(StoreError::Timeout);
            }
        };

        match row {
            Some(row) => {
                let decoded = RecapRow::from_pg_row(&row)?;
                debug!(user_id = decoded.user_id, "recap row found");
                Ok(Some(decoded.into()))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> std::result::Result<(), StoreError> {
        match timeout(self.query_timeout, query("SELECT 1").execute(&self.pool)).await {
            Ok(result) => result.map(|_| ()).map_err(classify),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}
