use stock_server::db::repository::store as store_repo;
use stock_server::shopify::{CatalogConnector, webhooks::register_webhooks};
use stock_server::{BackgroundTasks, Config, ServerState, TaskKind};
use stock_server::{CatalogSyncWorker, SchedulePoller};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment + logging
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    tracing::info!("StockMaster server starting...");

    let config = Config::from_env();
    let state = ServerState::initialize(&config).await?;

    // Make sure every active store has its webhook subscriptions in place.
    if let Some(base_url) = &config.webhook_base_url {
        ensure_webhooks(&state, base_url).await;
    }

    let mut tasks = BackgroundTasks::new();

    // Scheduled-work poller: due rule applications and restorations
    let poller = SchedulePoller::new(
        state.db.pool.clone(),
        state.rule_engine(),
        config.poll_interval,
        tasks.shutdown_token(),
    );
    tasks.spawn("schedule_poller", TaskKind::Periodic, poller.run());

    // Periodic full-catalog sync for every active store
    let sync_worker = CatalogSyncWorker::new(
        state.sync_engine(),
        state.db.pool.clone(),
        config.sync_interval,
        tasks.shutdown_token(),
    );
    tasks.spawn("catalog_sync", TaskKind::Worker, sync_worker.run());

    tracing::info!(tasks = tasks.len(), "Background tasks running");

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;
    Ok(())
}

/// Best-effort webhook registration at startup; a failing store is logged
/// and does not block the others.
async fn ensure_webhooks(state: &ServerState, base_url: &str) {
    let stores = match store_repo::find_active(&state.db.pool).await {
        Ok(stores) => stores,
        Err(e) => {
            tracing::error!("Failed to list active stores for webhook registration: {e}");
            return;
        }
    };

    for store in stores {
        let session = match state.connector.connect(&store).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(shop = %store.shop_domain, "Skipping webhook registration: {e}");
                continue;
            }
        };
        match register_webhooks(&state.db.pool, &session, store.id, base_url).await {
            Ok(created) if created > 0 => {
                tracing::info!(shop = %store.shop_domain, created, "Registered missing webhooks");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(shop = %store.shop_domain, "Webhook registration failed: {e}");
            }
        }
    }
}
