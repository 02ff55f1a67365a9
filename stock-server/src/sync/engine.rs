//! Reconciliation Engine

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::db::repository::{inventory, product as product_repo, store as store_repo};
use crate::shopify::{CatalogApi, CatalogConnector, CatalogSession, ShopifyError};
use crate::utils::{AppError, AppResult};
use shared::models::{Product, Store, SyncStatus};
use shared::remote::RemoteProduct;
use shared::util::now_millis;

/// Bounded re-invocations of a failed sync pass.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between attempts.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Counters from one completed sync pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub products_synced: usize,
    pub variants_synced: usize,
    pub levels_synced: usize,
    /// Per-variant level lookups that failed and were skipped.
    pub level_failures: usize,
    /// Products marked "not currently synced" (absent from this pass).
    pub products_unseen: u64,
}

/// Drives full-catalog reconciliation for one store at a time.
#[derive(Clone)]
pub struct SyncEngine {
    pool: SqlitePool,
    connector: Arc<dyn CatalogConnector>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl SyncEngine {
    pub fn new(pool: SqlitePool, connector: Arc<dyn CatalogConnector>) -> Self {
        Self {
            pool,
            connector,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override retry policy (tests use millisecond delays).
    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Re-invoke [`Self::synchronize`] with bounded attempts and fixed
    /// delay. Only transient failures are retried; a missing or revoked
    /// credential stops immediately.
    pub async fn synchronize_with_retry(&self, store_id: i64) -> AppResult<SyncOutcome> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.synchronize(store_id).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        store_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_secs = self.retry_delay.as_secs_f64(),
                        "Sync attempt failed, retrying: {e}"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One full sync pass. Store sync status is `in_progress` for the
    /// duration and ends at `success` or `failed`; the remote session is
    /// scoped to the pass and released on every exit path.
    pub async fn synchronize(&self, store_id: i64) -> AppResult<SyncOutcome> {
        let store = store_repo::find_by_id(&self.pool, store_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Store {store_id} not found")))?;

        if !store.has_credential() {
            tracing::error!(store_id, shop = %store.shop_domain, "Store has no access token");
            store_repo::set_sync_status(&self.pool, store_id, SyncStatus::Failed).await?;
            return Err(AppError::from(ShopifyError::MissingCredential));
        }

        store_repo::set_sync_status(&self.pool, store_id, SyncStatus::InProgress).await?;
        tracing::info!(store_id, shop = %store.shop_domain, "Starting catalog sync");

        match self.run_pass(&store).await {
            Ok(outcome) => {
                store_repo::mark_sync_success(&self.pool, store_id, now_millis()).await?;
                tracing::info!(
                    store_id,
                    products = outcome.products_synced,
                    variants = outcome.variants_synced,
                    levels = outcome.levels_synced,
                    level_failures = outcome.level_failures,
                    "Catalog sync completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(store_id, shop = %store.shop_domain, "Catalog sync failed: {e}");
                store_repo::set_sync_status(&self.pool, store_id, SyncStatus::Failed).await?;
                Err(e)
            }
        }
    }

    async fn run_pass(&self, store: &Store) -> AppResult<SyncOutcome> {
        // Session scoped to this pass; dropping it releases the session on
        // success and error paths alike.
        let session = self.connector.connect(store).await?;

        // Fetch the complete remote product set via cursor pagination.
        let mut remote_products: Vec<RemoteProduct> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = session.api().fetch_products(cursor.as_deref()).await?;
            remote_products.extend(page.products);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        tracing::info!(
            store_id = store.id,
            count = remote_products.len(),
            "Fetched remote products"
        );

        let now = now_millis();
        let mut outcome = SyncOutcome::default();
        let mut seen_products = Vec::with_capacity(remote_products.len());

        for remote in &remote_products {
            self.sync_one_product(&session, store, remote, now, &mut outcome)
                .await?;
            seen_products.push(remote.id);
        }

        // Entities not seen in this pass: bump their timestamps so they are
        // identifiable as "not currently synced"; history is preserved.
        outcome.products_unseen =
            product_repo::touch_unseen(&self.pool, store.id, &seen_products, now).await?;

        Ok(outcome)
    }

    /// Upsert one product with its variants and inventory levels.
    ///
    /// A failed level lookup for a single variant is logged and skipped so
    /// the rest of the batch proceeds.
    async fn sync_one_product(
        &self,
        session: &CatalogSession,
        store: &Store,
        remote: &RemoteProduct,
        now: i64,
        outcome: &mut SyncOutcome,
    ) -> AppResult<Product> {
        let product = product_repo::upsert_from_remote(&self.pool, store.id, remote, now).await?;
        outcome.products_synced += 1;

        let mut seen_variants = Vec::with_capacity(remote.variants.len());
        for remote_variant in &remote.variants {
            let variant =
                product_repo::upsert_variant_from_remote(&self.pool, product.id, remote_variant, now)
                    .await?;
            outcome.variants_synced += 1;
            seen_variants.push(remote_variant.id);

            match session
                .api()
                .fetch_inventory_levels(&[remote_variant.inventory_item_id])
                .await
            {
                Ok(levels) => {
                    for level in levels {
                        let location = inventory::get_or_create_location(
                            &self.pool,
                            store.id,
                            level.location_id,
                            &format!("Location {}", level.location_id),
                        )
                        .await?;
                        inventory::upsert_level(
                            &self.pool,
                            variant.id,
                            location.id,
                            level.available.unwrap_or(0),
                            now,
                        )
                        .await?;
                        outcome.levels_synced += 1;
                    }
                }
                Err(e) => {
                    // One bad inventory-item lookup must not abort the sync.
                    tracing::warn!(
                        store_id = store.id,
                        variant_remote_id = remote_variant.id,
                        inventory_item_id = remote_variant.inventory_item_id,
                        "Could not sync inventory levels, skipping variant: {e}"
                    );
                    outcome.level_failures += 1;
                }
            }
        }

        product_repo::touch_unseen_variants(&self.pool, product.id, &seen_variants, now).await?;
        Ok(product)
    }

    /// Targeted refresh of one product (webhook path). Returns the mirrored
    /// product, or `None` when the remote no longer has it.
    pub async fn refresh_product(
        &self,
        store: &Store,
        remote_product_id: i64,
    ) -> AppResult<Option<Product>> {
        let session = self.connector.connect(store).await?;
        let Some(remote) = session.api().fetch_product(remote_product_id).await? else {
            tracing::warn!(
                store_id = store.id,
                remote_product_id,
                "Product no longer exists remotely"
            );
            return Ok(None);
        };

        let now = now_millis();
        let mut outcome = SyncOutcome::default();
        let product = self
            .sync_one_product(&session, store, &remote, now, &mut outcome)
            .await?;
        Ok(Some(product))
    }
}
