//! Shared test harness: in-memory database + scriptable mock catalog.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stock_server::core::{Config, ServerState};
use stock_server::db::DbService;
use stock_server::notify::RecordingDispatcher;
use stock_server::shopify::{CatalogApi, CatalogConnector, CatalogSession, ShopifyError};

use shared::models::Store;
use shared::remote::{
    ProductPage, ProductPatch, RemoteInventoryLevel, RemoteProduct, RemoteVariant, RemoteWebhook,
};

// =============================================================================
// Mock catalog
// =============================================================================

#[derive(Default)]
pub struct MockState {
    pub products: Vec<RemoteProduct>,
    /// inventory_item_id → levels
    pub levels: HashMap<i64, Vec<RemoteInventoryLevel>>,
    pub webhooks: Vec<RemoteWebhook>,
    /// Products served per page; 0 = everything on one page.
    pub page_size: usize,
    /// inventory_item_ids whose level lookups fail with a server error.
    pub fail_levels_for: HashSet<i64>,
    pub fail_update_product: bool,
    /// Session establishment rejected with 401.
    pub auth_revoked: bool,
    /// Transient connect failures before connects succeed again.
    pub connect_failures_remaining: u32,
    /// Recorded `update_product` calls: (remote_id, patched status).
    pub product_updates: Vec<(i64, Option<String>)>,
    pub pages_served: u32,
    pub connects: u32,
}

#[derive(Default)]
pub struct MockCatalog {
    pub state: Mutex<MockState>,
}

impl MockCatalog {
    pub fn set_products(&self, products: Vec<RemoteProduct>) {
        self.state.lock().unwrap().products = products;
    }

    pub fn set_level(&self, inventory_item_id: i64, location_id: i64, available: i64) {
        let mut state = self.state.lock().unwrap();
        let levels = state.levels.entry(inventory_item_id).or_default();
        match levels.iter_mut().find(|l| l.location_id == location_id) {
            Some(level) => level.available = Some(available),
            None => levels.push(RemoteInventoryLevel {
                inventory_item_id,
                location_id,
                available: Some(available),
            }),
        }
    }

    pub fn product_updates(&self) -> Vec<(i64, Option<String>)> {
        self.state.lock().unwrap().product_updates.clone()
    }

    pub fn pages_served(&self) -> u32 {
        self.state.lock().unwrap().pages_served
    }
}

#[async_trait]
impl CatalogApi for MockCatalog {
    async fn fetch_products(&self, cursor: Option<&str>) -> Result<ProductPage, ShopifyError> {
        let mut state = self.state.lock().unwrap();
        state.pages_served += 1;

        let start: usize = cursor
            .map(|c| c.parse().expect("mock cursor is an index"))
            .unwrap_or(0);
        let page_size = if state.page_size == 0 {
            state.products.len().max(1)
        } else {
            state.page_size
        };

        let end = (start + page_size).min(state.products.len());
        let products = state.products[start..end].to_vec();
        let next_cursor = (end < state.products.len()).then(|| end.to_string());
        Ok(ProductPage {
            products,
            next_cursor,
        })
    }

    async fn fetch_product(&self, remote_id: i64) -> Result<Option<RemoteProduct>, ShopifyError> {
        let state = self.state.lock().unwrap();
        Ok(state.products.iter().find(|p| p.id == remote_id).cloned())
    }

    async fn fetch_inventory_levels(
        &self,
        inventory_item_ids: &[i64],
    ) -> Result<Vec<RemoteInventoryLevel>, ShopifyError> {
        let state = self.state.lock().unwrap();
        if inventory_item_ids
            .iter()
            .any(|id| state.fail_levels_for.contains(id))
        {
            return Err(ShopifyError::Server { status: 500 });
        }
        Ok(inventory_item_ids
            .iter()
            .flat_map(|id| state.levels.get(id).cloned().unwrap_or_default())
            .collect())
    }

    async fn update_product(
        &self,
        remote_id: i64,
        patch: &ProductPatch,
    ) -> Result<(), ShopifyError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_update_product {
            return Err(ShopifyError::Server { status: 500 });
        }
        state.product_updates.push((remote_id, patch.status.clone()));
        Ok(())
    }

    async fn get_webhooks(&self) -> Result<Vec<RemoteWebhook>, ShopifyError> {
        Ok(self.state.lock().unwrap().webhooks.clone())
    }

    async fn create_webhook(
        &self,
        topic: &str,
        address: &str,
    ) -> Result<RemoteWebhook, ShopifyError> {
        let mut state = self.state.lock().unwrap();
        let webhook = RemoteWebhook {
            id: 9000 + state.webhooks.len() as i64,
            topic: topic.to_string(),
            address: address.to_string(),
        };
        state.webhooks.push(webhook.clone());
        Ok(webhook)
    }
}

/// Connector handing out sessions backed by the mock catalog.
pub struct MockConnector(pub Arc<MockCatalog>);

#[async_trait]
impl CatalogConnector for MockConnector {
    async fn connect(&self, store: &Store) -> Result<CatalogSession, ShopifyError> {
        if !store.has_credential() {
            return Err(ShopifyError::MissingCredential);
        }
        let mut state = self.0.state.lock().unwrap();
        state.connects += 1;
        if state.auth_revoked {
            return Err(ShopifyError::AuthRevoked { status: 401 });
        }
        if state.connect_failures_remaining > 0 {
            state.connect_failures_remaining -= 1;
            return Err(ShopifyError::Server { status: 503 });
        }
        drop(state);
        Ok(CatalogSession::new(
            store.shop_domain.clone(),
            self.0.clone(),
        ))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub struct TestContext {
    pub state: ServerState,
    pub catalog: Arc<MockCatalog>,
    pub dispatcher: Arc<RecordingDispatcher>,
}

impl TestContext {
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.state.db.pool
    }
}

pub async fn setup() -> TestContext {
    let catalog = Arc::new(MockCatalog::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());

    let mut config = Config::from_env();
    config.sync_max_attempts = 3;
    config.sync_retry_delay = Duration::from_millis(10);

    let db = DbService::in_memory().await.expect("in-memory database");
    let state = ServerState::with_collaborators(
        config,
        db,
        Arc::new(MockConnector(catalog.clone())),
        dispatcher.clone(),
    );

    TestContext {
        state,
        catalog,
        dispatcher,
    }
}

pub fn remote_variant(id: i64, inventory_item_id: i64, price: &str) -> RemoteVariant {
    RemoteVariant {
        id,
        title: "Default".into(),
        sku: Some(format!("SKU-{id}")),
        price: Some(price.to_string()),
        position: 1,
        inventory_item_id,
    }
}

pub fn remote_product(
    id: i64,
    title: &str,
    product_type: Option<&str>,
    vendor: Option<&str>,
    variants: Vec<RemoteVariant>,
) -> RemoteProduct {
    RemoteProduct {
        id,
        title: title.into(),
        handle: title.to_lowercase().replace(' ', "-"),
        product_type: product_type.map(Into::into),
        vendor: vendor.map(Into::into),
        status: "active".into(),
        published_at: Some("2024-01-01T00:00:00+00:00".into()),
        variants,
    }
}
