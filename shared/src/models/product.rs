//! Product and Variant Models

use serde::{Deserialize, Serialize};

/// A product mirrored from the remote catalog.
///
/// `(store_id, remote_id)` is the natural key. Visibility fields are driven
/// only by the rule state machine or the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub store_id: i64,
    pub remote_id: i64,
    pub title: String,
    pub handle: String,
    pub product_type: Option<String>,
    pub vendor: Option<String>,
    /// Remote status: active, draft, archived.
    pub status: String,
    pub published_at: Option<i64>,
    pub is_visible: bool,
    pub hidden_at: Option<i64>,
    pub scheduled_return: Option<i64>,
    pub last_synced: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A purchasable variant of a product.
///
/// `(product_id, remote_id)` is the natural key; `inventory_item_id` links
/// the variant to its remote inventory levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub remote_id: i64,
    pub title: String,
    pub sku: Option<String>,
    pub price: f64,
    pub position: i64,
    pub inventory_item_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}
