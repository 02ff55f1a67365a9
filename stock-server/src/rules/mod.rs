//! Rule engine — trigger evaluation, scheduling, and the application state
//! machine.
//!
//! Control flow: inbound event → [`RuleEngine::evaluate_stock_state`] →
//! matcher → scheduler (dedup insert) → (delay elapses, poller) → apply
//! transition → catalog mutation + audit log + notification decision.

pub mod machine;
pub mod matcher;
pub mod scheduler;

pub use machine::ApplyOutcome;
pub use scheduler::ScheduleResult;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::db::repository::{inventory, rule as rule_repo};
use crate::notify::NotificationDispatcher;
use crate::shopify::CatalogConnector;
use crate::utils::AppResult;
use shared::models::{Product, Rule, Store, TriggerKind};

/// Shared rule machinery: owns the pool, the remote connector (for pushing
/// visibility changes) and the notification dispatcher.
#[derive(Clone)]
pub struct RuleEngine {
    pub(crate) pool: SqlitePool,
    pub(crate) connector: Arc<dyn CatalogConnector>,
    pub(crate) dispatcher: Arc<dyn NotificationDispatcher>,
}

impl RuleEngine {
    pub fn new(
        pool: SqlitePool,
        connector: Arc<dyn CatalogConnector>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            pool,
            connector,
            dispatcher,
        }
    }

    /// Evaluate a product's current stock totals against every trigger kind
    /// and schedule all matching rules. Returns how many applications were
    /// newly scheduled.
    pub async fn evaluate_stock_state(&self, store: &Store, product: &Product) -> AppResult<usize> {
        let total = inventory::total_available(&self.pool, product.id).await?;

        let mut scheduled = 0;
        if total <= 0 {
            scheduled += self
                .process_trigger(store, product, TriggerKind::OutOfStock, total)
                .await?;
        } else {
            scheduled += self
                .process_trigger(store, product, TriggerKind::LowStock, total)
                .await?;
            if !product.is_visible {
                scheduled += self
                    .process_trigger(store, product, TriggerKind::BackInStock, total)
                    .await?;
            }
        }
        Ok(scheduled)
    }

    /// Run one trigger kind: load active rules in priority order, filter
    /// through the matcher, schedule each match.
    async fn process_trigger(
        &self,
        store: &Store,
        product: &Product,
        trigger: TriggerKind,
        total_available: i64,
    ) -> AppResult<usize> {
        let rules = rule_repo::find_active_by_trigger(&self.pool, store.id, trigger).await?;
        if rules.is_empty() {
            return Ok(0);
        }

        tracing::debug!(
            store_id = store.id,
            product_id = product.id,
            trigger = %trigger,
            total_available,
            candidates = rules.len(),
            "Evaluating stock trigger"
        );

        let mut scheduled = 0;
        for rule in &rules {
            if !Self::trigger_satisfied(rule, trigger, total_available) {
                continue;
            }
            if !matcher::rule_matches_product(rule, product) {
                continue;
            }
            tracing::info!(
                rule_id = rule.id,
                product_id = product.id,
                trigger = %trigger,
                "Rule matches product"
            );
            if let ScheduleResult::Scheduled(_) = self.schedule(rule, product).await? {
                scheduled += 1;
            }
        }
        Ok(scheduled)
    }

    /// Quantity-side condition of a trigger; the matcher handles the
    /// attribute filters.
    fn trigger_satisfied(rule: &Rule, trigger: TriggerKind, total_available: i64) -> bool {
        match trigger {
            TriggerKind::OutOfStock => total_available <= 0,
            TriggerKind::LowStock => total_available > 0 && total_available <= rule.threshold,
            TriggerKind::BackInStock => total_available > 0,
        }
    }
}
