//! Catalog session discipline
//!
//! The remote session is an explicit value scoped to one operation, never
//! process-wide state. Holding a [`CatalogSession`] is holding the session;
//! dropping it on any exit path (including errors) releases it.

use async_trait::async_trait;
use shared::models::Store;
use std::sync::Arc;

use super::{CatalogApi, ShopifyClient, ShopifyError};

/// Creates sessions from store credentials. The engine depends on this
/// trait, not on the concrete HTTP client.
#[async_trait]
pub trait CatalogConnector: Send + Sync {
    async fn connect(&self, store: &Store) -> Result<CatalogSession, ShopifyError>;
}

/// An open session against one store's remote catalog.
pub struct CatalogSession {
    shop_domain: String,
    api: Arc<dyn CatalogApi>,
}

impl CatalogSession {
    pub fn new(shop_domain: impl Into<String>, api: Arc<dyn CatalogApi>) -> Self {
        let shop_domain = shop_domain.into();
        tracing::debug!(shop = %shop_domain, "Catalog session opened");
        Self { shop_domain, api }
    }

    pub fn api(&self) -> &dyn CatalogApi {
        self.api.as_ref()
    }

    pub fn shop_domain(&self) -> &str {
        &self.shop_domain
    }
}

impl Drop for CatalogSession {
    fn drop(&mut self) {
        tracing::debug!(shop = %self.shop_domain, "Catalog session released");
    }
}

/// Production connector: builds a [`ShopifyClient`] from the stored OAuth
/// credential.
#[derive(Default)]
pub struct ShopifyConnector;

#[async_trait]
impl CatalogConnector for ShopifyConnector {
    async fn connect(&self, store: &Store) -> Result<CatalogSession, ShopifyError> {
        let token = store
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ShopifyError::MissingCredential)?;
        let client = ShopifyClient::new(&store.shop_domain, token)?;
        Ok(CatalogSession::new(
            store.shop_domain.clone(),
            Arc::new(client),
        ))
    }
}
