//! Inventory Models — locations, levels, and the append-only audit log

use serde::{Deserialize, Serialize};

/// A fulfillment location, created lazily during reconciliation
/// (get-or-create by `(store_id, remote_id)`; first reference wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryLocation {
    pub id: i64,
    pub store_id: i64,
    pub remote_id: i64,
    pub name: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Available quantity for one variant at one location.
///
/// `(variant_id, location_id)` is the natural key. A product is out of stock
/// when the sum of `available` over all its variant/location pairs is <= 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryLevel {
    pub id: i64,
    pub variant_id: i64,
    pub location_id: i64,
    pub available: i64,
    pub last_synced: i64,
    pub updated_at: i64,
}

/// Audit log action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type), sqlx(rename_all = "snake_case"))]
pub enum LogAction {
    /// Quantity synced from the remote catalog.
    Sync,
    /// Product hidden.
    Hide,
    /// Product shown.
    Show,
    /// Visibility change scheduled / reversed on schedule.
    Schedule,
    /// Rule applied.
    Rule,
    /// Manual update.
    Manual,
}

/// One row of the append-only inventory audit trail. Never updated or
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryLog {
    pub id: i64,
    pub store_id: i64,
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub location_id: Option<i64>,
    pub action: LogAction,
    pub previous_value: Option<i64>,
    pub new_value: Option<i64>,
    pub previous_status: Option<String>,
    pub new_status: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
}

/// Payload for appending an audit entry (id/created_at assigned on insert).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEntry {
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub location_id: Option<i64>,
    pub previous_value: Option<i64>,
    pub new_value: Option<i64>,
    pub previous_status: Option<String>,
    pub new_status: Option<String>,
    pub notes: Option<String>,
}
