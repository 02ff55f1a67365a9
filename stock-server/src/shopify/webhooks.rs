//! Webhook subscription management
//!
//! Ensures the remote store has the subscriptions the core depends on.
//! Registration is idempotent: existing topics are recorded, missing ones
//! created.

use sqlx::SqlitePool;

use crate::db::repository::webhook;
use crate::utils::{AppError, AppResult};

use super::{CatalogApi, CatalogSession};

/// Webhook topics the core consumes through the inbound-event boundary.
pub const REQUIRED_TOPICS: &[&str] = &[
    "products/update",
    "inventory_levels/update",
    "app/uninstalled",
];

/// Register the required webhook topics for one store.
///
/// `base_url` is the publicly reachable host of the (external) webhook
/// receiver; each topic is delivered to `{base_url}/webhooks/{topic}`.
/// Returns how many subscriptions were newly created.
pub async fn register_webhooks(
    pool: &SqlitePool,
    session: &CatalogSession,
    store_id: i64,
    base_url: &str,
) -> AppResult<usize> {
    let existing = session.api().get_webhooks().await?;

    let mut created = 0;
    for topic in REQUIRED_TOPICS {
        let address = format!("{}/webhooks/{}", base_url.trim_end_matches('/'), topic);

        let remote = match existing.iter().find(|w| w.topic == *topic) {
            Some(found) => found.clone(),
            None => {
                let webhook = session.api().create_webhook(topic, &address).await?;
                tracing::info!(
                    shop = %session.shop_domain(),
                    topic,
                    remote_id = webhook.id,
                    "Webhook subscription created"
                );
                created += 1;
                webhook
            }
        };

        webhook::upsert(pool, store_id, remote.id, &remote.topic, &remote.address)
            .await
            .map_err(AppError::from)?;
    }

    Ok(created)
}
