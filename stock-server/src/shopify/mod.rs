//! Remote catalog client
//!
//! Typed wrapper over the store admin REST API plus the session discipline
//! around it. The rest of the core only sees [`CatalogApi`] (the RPC
//! surface) and [`CatalogConnector`] (credential → session), so tests swap
//! in an in-memory catalog without touching the engine.

pub mod client;
pub mod session;
pub mod webhooks;

pub use client::ShopifyClient;
pub use session::{CatalogConnector, CatalogSession, ShopifyConnector};

use async_trait::async_trait;
use shared::remote::{ProductPage, ProductPatch, RemoteInventoryLevel, RemoteProduct, RemoteWebhook};
use std::time::Duration;

/// Remote API error taxonomy.
///
/// Transient errors (rate limit, network, 5xx) are retried by callers;
/// permanent ones (revoked auth, other 4xx) surface as store sync `failed`
/// until re-auth happens externally.
#[derive(Debug, thiserror::Error)]
pub enum ShopifyError {
    #[error("Store has no access credential")]
    MissingCredential,

    #[error("Authentication rejected by remote (HTTP {status})")]
    AuthRevoked { status: u16 },

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Remote server error (HTTP {status})")]
    Server { status: u16 },

    #[error("Remote API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response payload: {0}")]
    Decode(String),
}

impl ShopifyError {
    /// Whether re-issuing the call can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopifyError::RateLimited { .. }
                | ShopifyError::Server { .. }
                | ShopifyError::Network(_)
        )
    }
}

/// The RPC surface of the remote catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page of products; `cursor` is the opaque `page_info` from the
    /// previous page.
    async fn fetch_products(&self, cursor: Option<&str>) -> Result<ProductPage, ShopifyError>;

    /// A single product, `None` if it no longer exists remotely.
    async fn fetch_product(&self, remote_id: i64) -> Result<Option<RemoteProduct>, ShopifyError>;

    /// Levels for a batch of inventory items across all locations.
    async fn fetch_inventory_levels(
        &self,
        inventory_item_ids: &[i64],
    ) -> Result<Vec<RemoteInventoryLevel>, ShopifyError>;

    /// Push a partial product update (visibility changes).
    async fn update_product(&self, remote_id: i64, patch: &ProductPatch)
    -> Result<(), ShopifyError>;

    async fn get_webhooks(&self) -> Result<Vec<RemoteWebhook>, ShopifyError>;

    async fn create_webhook(
        &self,
        topic: &str,
        address: &str,
    ) -> Result<RemoteWebhook, ShopifyError>;
}
