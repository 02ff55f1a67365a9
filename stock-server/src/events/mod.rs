//! Inbound event boundary
//!
//! Entry points for events the (external) webhook-validation layer hands to
//! the core. Signature verification has already happened upstream; these
//! functions trust their inputs and only re-resolve them against local
//! state.

use sqlx::SqlitePool;

use crate::db::repository::{inventory, product as product_repo, store as store_repo};
use crate::rules::RuleEngine;
use crate::sync::SyncEngine;
use crate::utils::{AppError, AppResult};
use shared::models::{LogAction, LogEntry, Store};
use shared::util::now_millis;

/// Processes validated inbound events.
#[derive(Clone)]
pub struct EventProcessor {
    pool: SqlitePool,
    sync: SyncEngine,
    rules: RuleEngine,
}

impl EventProcessor {
    pub fn new(pool: SqlitePool, sync: SyncEngine, rules: RuleEngine) -> Self {
        Self { pool, sync, rules }
    }

    /// `products/update`: refresh the product mirror, then evaluate stock
    /// triggers against the fresh totals.
    pub async fn on_product_update(
        &self,
        shop_domain: &str,
        remote_product_id: i64,
    ) -> AppResult<()> {
        let store = self.active_store(shop_domain).await?;

        let Some(product) = self.sync.refresh_product(&store, remote_product_id).await? else {
            return Ok(());
        };

        let scheduled = self.rules.evaluate_stock_state(&store, &product).await?;
        tracing::info!(
            store_id = store.id,
            product_id = product.id,
            scheduled,
            "Processed product update"
        );
        Ok(())
    }

    /// `inventory_levels/update`: mirror the new quantity, audit the delta,
    /// then evaluate stock triggers for the owning product.
    pub async fn on_inventory_level_update(
        &self,
        shop_domain: &str,
        inventory_item_id: i64,
        location_remote_id: i64,
        available: i64,
    ) -> AppResult<()> {
        let store = self.active_store(shop_domain).await?;

        let Some(variant) =
            product_repo::find_variant_by_inventory_item(&self.pool, store.id, inventory_item_id)
                .await?
        else {
            // A level for a variant we have never mirrored; the next full
            // sync will pick it up.
            tracing::warn!(
                store_id = store.id,
                inventory_item_id,
                "Inventory update for unknown variant, ignoring"
            );
            return Ok(());
        };

        let location = inventory::get_or_create_location(
            &self.pool,
            store.id,
            location_remote_id,
            &format!("Location {location_remote_id}"),
        )
        .await?;

        let now = now_millis();
        let (_, previous) =
            inventory::upsert_level(&self.pool, variant.id, location.id, available, now).await?;

        inventory::append_log(
            &self.pool,
            store.id,
            LogAction::Sync,
            LogEntry {
                product_id: Some(variant.product_id),
                variant_id: Some(variant.id),
                location_id: Some(location.id),
                previous_value: previous,
                new_value: Some(available),
                notes: Some("Inventory level update received".to_string()),
                ..Default::default()
            },
        )
        .await?;

        let product = product_repo::find_by_id(&self.pool, variant.product_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Product {} not found", variant.product_id))
            })?;

        let scheduled = self.rules.evaluate_stock_state(&store, &product).await?;
        tracing::info!(
            store_id = store.id,
            product_id = product.id,
            previous,
            available,
            scheduled,
            "Processed inventory level update"
        );
        Ok(())
    }

    /// `app/uninstalled`: clear the credential and deactivate the store.
    /// Mirrored data and history are kept.
    pub async fn on_app_uninstalled(&self, shop_domain: &str) -> AppResult<()> {
        let store = store_repo::find_by_domain(&self.pool, shop_domain)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Store {shop_domain} not found")))?;

        store_repo::deactivate(&self.pool, store.id).await?;
        tracing::info!(store_id = store.id, shop = %shop_domain, "Store uninstalled");
        Ok(())
    }

    async fn active_store(&self, shop_domain: &str) -> AppResult<Store> {
        let store = store_repo::find_by_domain(&self.pool, shop_domain)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Store {shop_domain} not found")))?;
        if !store.is_active {
            return Err(AppError::validation(format!(
                "Store {shop_domain} is not active"
            )));
        }
        Ok(store)
    }
}
