//! Decoding of `user_recap_data` rows.
//!
//! Every nullable column is read into an explicit `Option` once, here, so the
//! rest of the service never sees database nulls.

use recap_storage::{RecapRecord, StoreError};
use serde_json::Value;
use sqlx_core::decode::Decode;
use sqlx_core::row::Row;
use sqlx_core::types::Type;
use sqlx_postgres::{PgRow, Postgres};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RecapRow {
    pub user_id: i64,
    pub user_name: String,
    pub trx_count: i32,
    pub variant_count: Option<i32>,
    pub total_point: Option<i64>,
    pub total_point_description: Option<String>,
    pub total_point_possible_redeem: Option<i32>,
    pub total_point_image: Option<String>,
    pub delivery_count: Option<i32>,
    pub pickup_count: Option<i32>,
    pub cheaper_subs_desc: Option<String>,
    pub cheaper_subs_amount: Option<f64>,
    pub top_ranking: Option<i32>,
    pub list_circular_images: Option<Value>,
    pub list_product_favorite: Option<Value>,
    pub list_favorite_store: Option<Value>,
}

impl RecapRow {
    pub(crate) fn from_pg_row(row: &PgRow) -> Result<Self, StoreError> {
        Ok(Self {
            user_id: column(row, "user_id")?,
            user_name: column(row, "user_name")?,
            trx_count: column(row, "trx_count")?,
            variant_count: column(row, "variant_count")?,
            total_point: column(row, "total_point")?,
            total_point_description: column(row, "total_point_description")?,
            total_point_possible_redeem: column(row, "total_point_possible_redeem")?,
            total_point_image: column(row, "total_point_image")?,
            delivery_count: column(row, "delivery_count")?,
            pickup_count: column(row, "pickup_count")?,
            cheaper_subs_desc: column(row, "cheaper_subs_desc")?,
            cheaper_subs_amount: column(row, "cheaper_subs_amount")?,
            top_ranking: column(row, "top_ranking")?,
            list_circular_images: column(row, "list_circular_images")?,
            list_product_favorite: column(row, "list_product_favorite")?,
            list_favorite_store: column(row, "list_favorite_store")?,
        })
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::decode(format!("column {name}: {e}")))
}

impl From<RecapRow> for RecapRecord {
    fn from(row: RecapRow) -> Self {
        Self {
            user_name: row.user_name,
            trx_count: i64::from(row.trx_count),
            variant_count: row.variant_count,
            total_point: row.total_point,
            total_point_description: row.total_point_description,
            total_point_possible_redeem: row.total_point_possible_redeem,
            total_point_image: row.total_point_image,
            delivery_count: row.delivery_count,
            pickup_count: row.pickup_count,
            cheaper_subs_desc: row.cheaper_subs_desc,
            cheaper_subs_amount: row.cheaper_subs_amount,
            top_ranking: row.top_ranking,
            // Anything other than an array of strings is treated as absent.
            list_circular_images: row
                .list_circular_images
                .and_then(|v| serde_json::from_value(v).ok()),
            list_product_favorite: row.list_product_favorite,
            list_favorite_store: row.list_favorite_store,
        }
    }
}
