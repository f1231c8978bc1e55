//! Recap record model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The per-user recap summary.
///
/// This is both the cached document and the response body. Optional fields
/// are omitted when absent rather than serialized as `null`, and fields that
/// are missing when deserializing (older cache entries, for example) come
/// back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecapRecord {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub trx_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_point: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_point_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_point_possible_redeem: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_point_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cheaper_subs_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cheaper_subs_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_ranking: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_circular_images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_product_favorite: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_favorite_store: Option<Value>,
}

impl RecapRecord {
    /// Creates a record with only the always-present fields set.
    #[must_use]
    pub fn new(user_name: impl Into<String>, trx_count: i64) -> Self {
        Self {
            user_name: user_name.into(),
            trx_count,
            ..Self::default()
        }
    }
}
