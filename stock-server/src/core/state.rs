//! Server state — holds the shared collaborators
//!
//! `ServerState` wires the pool, the remote-catalog connector, and the
//! notification dispatcher together and hands out the domain engines built
//! on top of them. Cloning is shallow (Arc everywhere).

use std::sync::Arc;

use crate::core::Config;
use crate::db::DbService;
use crate::events::EventProcessor;
use crate::notify::{LogDispatcher, NotificationDispatcher};
use crate::rules::RuleEngine;
use crate::shopify::{CatalogConnector, ShopifyConnector};
use crate::sync::SyncEngine;
use crate::utils::AppError;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub connector: Arc<dyn CatalogConnector>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
}

impl ServerState {
    /// Production wiring: real catalog connector, log-backed dispatcher.
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.database_path).await?;
        Ok(Self {
            config: config.clone(),
            db,
            connector: Arc::new(ShopifyConnector),
            dispatcher: Arc::new(LogDispatcher),
        })
    }

    /// Manual wiring, used by tests to substitute collaborators.
    pub fn with_collaborators(
        config: Config,
        db: DbService,
        connector: Arc<dyn CatalogConnector>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            config,
            db,
            connector,
            dispatcher,
        }
    }

    pub fn sync_engine(&self) -> SyncEngine {
        SyncEngine::new(self.db.pool.clone(), self.connector.clone())
            .with_retry(self.config.sync_max_attempts, self.config.sync_retry_delay)
    }

    pub fn rule_engine(&self) -> RuleEngine {
        RuleEngine::new(
            self.db.pool.clone(),
            self.connector.clone(),
            self.dispatcher.clone(),
        )
    }

    pub fn event_processor(&self) -> EventProcessor {
        EventProcessor::new(self.db.pool.clone(), self.sync_engine(), self.rule_engine())
    }
}
