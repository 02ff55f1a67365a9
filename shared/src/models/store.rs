//! Store Model

use serde::{Deserialize, Serialize};

/// Catalog sync state for a store. Mutated only by the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type), sqlx(rename_all = "snake_case"))]
pub enum SyncStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

/// One remote-connected merchant store (tenant).
///
/// Created on a successful install handshake; on uninstall the credential is
/// cleared and the store deactivated, rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Store {
    pub id: i64,
    /// The myshopify.com domain, unique across all stores.
    pub shop_domain: String,
    pub shop_name: Option<String>,
    /// OAuth access token. `None` after uninstall.
    pub access_token: Option<String>,
    pub is_active: bool,
    pub sync_status: SyncStatus,
    pub last_sync_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Store {
    /// Whether the store holds a usable credential for remote calls.
    pub fn has_credential(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
