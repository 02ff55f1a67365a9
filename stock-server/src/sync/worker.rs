//! CatalogSyncWorker — periodic full sync for every active store
//!
//! Registered as a background task; the poller handles rule deadlines, this
//! worker keeps the mirror fresh even when webhooks are missed.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::repository::store as store_repo;
use crate::sync::SyncEngine;

pub struct CatalogSyncWorker {
    engine: SyncEngine,
    pool: sqlx::SqlitePool,
    interval: Duration,
    shutdown: CancellationToken,
}

impl CatalogSyncWorker {
    pub fn new(
        engine: SyncEngine,
        pool: sqlx::SqlitePool,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            pool,
            interval,
            shutdown,
        }
    }

    /// Main loop: sync all active stores on a fixed interval.
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Catalog sync worker started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.sync_all().await;
                }
            }
        }

        tracing::info!("Catalog sync worker stopped");
    }

    /// One pass over all active stores. A failing store never aborts the
    /// others.
    pub async fn sync_all(&self) {
        let stores = match store_repo::find_active(&self.pool).await {
            Ok(stores) => stores,
            Err(e) => {
                tracing::error!("Failed to list active stores: {e}");
                return;
            }
        };

        for store in stores {
            if self.shutdown.is_cancelled() {
                return;
            }
            if let Err(e) = self.engine.synchronize_with_retry(store.id).await {
                tracing::error!(store_id = store.id, shop = %store.shop_domain, "Store sync failed: {e}");
            }
        }
    }
}
