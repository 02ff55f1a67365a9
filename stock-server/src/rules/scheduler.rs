//! Rule Scheduler
//!
//! Converts a matched rule into a `pending` application record. The dedup
//! guarantee comes from the storage layer: an atomic insert-if-absent
//! against the partial unique index, safe under concurrent dispatch and
//! repeated webhook delivery.

use crate::db::repository::rule as rule_repo;
use crate::utils::AppResult;
use shared::models::{Product, Rule, RuleApplication};
use shared::util::{minutes_to_millis, now_millis};

use super::RuleEngine;

/// Result of one schedule call.
#[derive(Debug)]
pub enum ScheduleResult {
    /// A new pending application was created.
    Scheduled(RuleApplication),
    /// A pending application for this (rule, product) already exists.
    Deduplicated,
}

impl RuleEngine {
    /// Schedule `rule` against `product`.
    ///
    /// `scheduled_for = now + delay`; zero delay dispatches the apply step
    /// in-line after the insert commits, with the poller as the safety net
    /// should that dispatch be lost.
    pub async fn schedule(&self, rule: &Rule, product: &Product) -> AppResult<ScheduleResult> {
        let now = now_millis();
        let scheduled_for = now + minutes_to_millis(rule.delay_minutes.max(0));

        let Some(application) = rule_repo::insert_application_if_absent(
            &self.pool,
            rule.id,
            product.id,
            now,
            scheduled_for,
        )
        .await?
        else {
            tracing::info!(
                rule_id = rule.id,
                product_id = product.id,
                "Rule already scheduled for product"
            );
            return Ok(ScheduleResult::Deduplicated);
        };

        tracing::info!(
            rule_id = rule.id,
            product_id = product.id,
            application_id = application.id,
            scheduled_for,
            "Scheduled rule application"
        );

        // Immediate dispatch for the common no-delay case.
        if rule.delay_minutes <= 0 {
            if let Err(e) = self.apply(application.id).await {
                tracing::error!(
                    application_id = application.id,
                    "Immediate apply dispatch failed: {e}"
                );
            }
        }

        Ok(ScheduleResult::Scheduled(application))
    }
}
