//! Store Webhook Model

use serde::{Deserialize, Serialize};

/// A webhook subscription registered on the remote store.
/// `(store_id, topic)` is unique: one subscription per topic per store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StoreWebhook {
    pub id: i64,
    pub store_id: i64,
    pub remote_id: i64,
    pub topic: String,
    pub address: String,
    pub created_at: i64,
}
