//! Rule Application State Machine
//!
//! Transitions: `pending -> applied | failed`, `applied -> reversed`. Both
//! transitions are guarded on the current status, so redelivered or
//! concurrently dispatched work items collapse to no-ops instead of
//! double-applying. Local writes of one transition (product visibility +
//! application status + audit row) share a single transaction.

use crate::db::repository::{notification, product as product_repo, rule as rule_repo, store as store_repo};
use crate::notify::rule_applied_payload;
use crate::shopify::{CatalogApi, CatalogConnector};
use crate::utils::{AppError, AppResult};
use shared::models::{ActionKind, ApplicationStatus, Product, Rule, RuleApplication, Store};
use shared::remote::ProductPatch;
use shared::util::{days_to_millis, now_millis};

use super::RuleEngine;

/// Result of an apply/restore dispatch.
#[derive(Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Reversed,
    /// Guard rejected the transition (wrong status, rule deactivated,
    /// or a concurrent worker won the race).
    Skipped,
    /// Terminal failure, recorded on the application's notes.
    Failed,
}

impl RuleEngine {
    /// Apply transition: `pending -> applied | failed`.
    pub async fn apply(&self, application_id: i64) -> AppResult<ApplyOutcome> {
        let application = self.load_application(application_id).await?;

        // Status guard: redelivery and poller races land here.
        if application.status != ApplicationStatus::Pending {
            tracing::info!(
                application_id,
                status = ?application.status,
                "Apply skipped: application is not pending"
            );
            return Ok(ApplyOutcome::Skipped);
        }

        let (rule, product, store) = self.load_context(&application).await?;

        // A rule deactivated mid-flight supersedes its pending work.
        if !rule.is_active {
            tracing::info!(application_id, rule_id = rule.id, "Apply skipped: rule deactivated");
            return Ok(ApplyOutcome::Skipped);
        }

        // Closed action set: an unknown stored string is a terminal,
        // per-item failure, not a worker crash.
        let action = match rule.action() {
            Ok(action) => action,
            Err(e) => {
                tracing::error!(application_id, rule_id = rule.id, "{e}");
                rule_repo::mark_application_failed(&self.pool, application_id, &e.to_string())
                    .await?;
                return Ok(ApplyOutcome::Failed);
            }
        };

        // Remote first: if the catalog API rejects the change nothing local
        // has moved yet, keeping visibility and status consistent.
        let patch = match action {
            ActionKind::HideProduct | ActionKind::ScheduleReturn => ProductPatch::hide(),
            ActionKind::ShowProduct => ProductPatch::show(),
        };
        if let Err(e) = self.push_remote(&store, &product, &patch).await {
            let note = format!("Remote update failed: {e}");
            tracing::error!(application_id, product_id = product.id, "{note}");
            rule_repo::mark_application_failed(&self.pool, application_id, &note).await?;
            return Ok(ApplyOutcome::Failed);
        }

        let now = now_millis();
        let hidden = matches!(action, ActionKind::HideProduct | ActionKind::ScheduleReturn);
        let restore_at = match action {
            ActionKind::ScheduleReturn => Some(now + days_to_millis(rule.restore_after_days.max(0))),
            ActionKind::HideProduct if rule.auto_restore && rule.restore_after_days > 0 => {
                Some(now + days_to_millis(rule.restore_after_days))
            }
            _ => None,
        };

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Guarded status flip; rows_affected == 0 means a concurrent worker
        // already moved this item.
        let flipped = sqlx::query(
            "UPDATE rule_application SET status = 'applied', applied_at = ?, restore_scheduled_for = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(restore_at)
        .bind(application_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if flipped.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            tracing::info!(application_id, "Apply skipped: lost race to concurrent worker");
            return Ok(ApplyOutcome::Skipped);
        }

        if hidden {
            sqlx::query(
                "UPDATE product SET is_visible = 0, hidden_at = ?1, scheduled_return = ?2, updated_at = ?1 WHERE id = ?3",
            )
            .bind(now)
            .bind(restore_at)
            .bind(product.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        } else {
            sqlx::query(
                "UPDATE product SET is_visible = 1, hidden_at = NULL, scheduled_return = NULL, updated_at = ?1 WHERE id = ?2",
            )
            .bind(now)
            .bind(product.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        let previous_status = visibility_label(product.is_visible);
        let new_status = visibility_label(!hidden);
        sqlx::query(
            r#"
            INSERT INTO inventory_log (id, store_id, product_id, action, previous_status, new_status, notes, created_at)
            VALUES (?1, ?2, ?3, 'rule', ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(shared::util::snowflake_id())
        .bind(store.id)
        .bind(product.id)
        .bind(previous_status)
        .bind(new_status)
        .bind(format!("Rule '{}' applied", rule.name))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        tracing::info!(
            application_id,
            rule_id = rule.id,
            product_id = product.id,
            action = %action,
            restore_at,
            "Rule applied"
        );

        if rule.send_notification {
            self.send_applied_notification(&store, &rule, &product, action, application_id)
                .await;
        }

        Ok(ApplyOutcome::Applied)
    }

    /// Restore transition: `applied -> reversed`.
    pub async fn restore(&self, application_id: i64) -> AppResult<ApplyOutcome> {
        let application = self.load_application(application_id).await?;

        if application.status != ApplicationStatus::Applied {
            tracing::info!(
                application_id,
                status = ?application.status,
                "Restore skipped: application was not applied"
            );
            return Ok(ApplyOutcome::Skipped);
        }

        let (rule, product, store) = self.load_context(&application).await?;

        if let Err(e) = self.push_remote(&store, &product, &ProductPatch::show()).await {
            // Restores are not auto-retried: clear the schedule so the
            // poller stops re-surfacing the item, keep the item `applied`,
            // and leave the reason on its notes.
            let note = format!("Restore remote update failed: {e}");
            tracing::error!(application_id, product_id = product.id, "{note}");
            sqlx::query(
                "UPDATE rule_application SET restore_scheduled_for = NULL, notes = ? WHERE id = ? AND status = 'applied'",
            )
            .bind(&note)
            .bind(application_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
            return Ok(ApplyOutcome::Failed);
        }

        let now = now_millis();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let flipped = sqlx::query(
            "UPDATE rule_application SET status = 'reversed', restored_at = ? WHERE id = ? AND status = 'applied'",
        )
        .bind(now)
        .bind(application_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if flipped.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            tracing::info!(application_id, "Restore skipped: lost race to concurrent worker");
            return Ok(ApplyOutcome::Skipped);
        }

        sqlx::query(
            "UPDATE product SET is_visible = 1, hidden_at = NULL, scheduled_return = NULL, updated_at = ?1 WHERE id = ?2",
        )
        .bind(now)
        .bind(product.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO inventory_log (id, store_id, product_id, action, previous_status, new_status, notes, created_at)
            VALUES (?1, ?2, ?3, 'schedule', 'hidden', 'visible', ?4, ?5)
            "#,
        )
        .bind(shared::util::snowflake_id())
        .bind(store.id)
        .bind(product.id)
        .bind(format!("Product restored after rule '{}'", rule.name))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        tracing::info!(
            application_id,
            rule_id = rule.id,
            product_id = product.id,
            "Product restored"
        );

        Ok(ApplyOutcome::Reversed)
    }

    async fn load_application(&self, application_id: i64) -> AppResult<RuleApplication> {
        rule_repo::find_application(&self.pool, application_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Rule application {application_id} not found")))
    }

    async fn load_context(
        &self,
        application: &RuleApplication,
    ) -> AppResult<(Rule, Product, Store)> {
        let rule = rule_repo::find_by_id(&self.pool, application.rule_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Rule {} not found", application.rule_id)))?;
        let product = product_repo::find_by_id(&self.pool, application.product_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Product {} not found", application.product_id))
            })?;
        let store = store_repo::find_by_id(&self.pool, product.store_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Store {} not found", product.store_id)))?;
        Ok((rule, product, store))
    }

    async fn push_remote(
        &self,
        store: &Store,
        product: &Product,
        patch: &ProductPatch,
    ) -> Result<(), crate::shopify::ShopifyError> {
        let session = self.connector.connect(store).await?;
        session.api().update_product(product.remote_id, patch).await
    }

    /// Persist the notification decision and hand it to the dispatcher.
    /// Failures on either side are logged only.
    async fn send_applied_notification(
        &self,
        store: &Store,
        rule: &Rule,
        product: &Product,
        action: ActionKind,
        application_id: i64,
    ) {
        let title = format!("Rule '{}' applied", rule.name);
        let message = format!(
            "Action '{}' was applied to product '{}'",
            action.as_str(),
            product.title
        );
        let record = match notification::create(
            &self.pool,
            store.id,
            "rule_applied",
            &title,
            &message,
            Some("rule_application"),
            Some(&application_id.to_string()),
        )
        .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(application_id, "Failed to record notification: {e}");
                return;
            }
        };

        let payload = rule_applied_payload(rule, product, action);
        match self.dispatcher.notify(store.id, "rule_applied", payload).await {
            Ok(()) => {
                if let Err(e) = notification::mark_sent(&self.pool, record.id).await {
                    tracing::warn!(notification_id = record.id, "Failed to mark notification sent: {e}");
                }
            }
            Err(e) => {
                tracing::warn!(notification_id = record.id, "Notification dispatch failed: {e}");
                if let Err(e) = notification::mark_failed(&self.pool, record.id, &e.to_string()).await
                {
                    tracing::warn!(
                        notification_id = record.id,
                        "Failed to mark notification failed: {e}"
                    );
                }
            }
        }
    }
}

fn visibility_label(visible: bool) -> &'static str {
    if visible { "visible" } else { "hidden" }
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::database(e.to_string())
}
