//! Rule + RuleApplication Repository
//!
//! Scheduling idempotence lives here: `insert_application_if_absent` is an
//! atomic insert against the partial unique index on
//! `(rule_id, product_id) WHERE status = 'pending'`, never a
//! check-then-create.

use super::{RepoError, RepoResult};
use shared::models::{Rule, RuleApplication, RuleDraft, TriggerKind};
use sqlx::SqlitePool;

const RULE_SELECT: &str = "SELECT id, store_id, name, description, trigger_type, threshold, action_type, delay_minutes, auto_restore, restore_after_days, product_type_filter, vendor_filter, send_notification, is_active, priority, created_at, updated_at FROM rule";

const APPLICATION_SELECT: &str = "SELECT id, rule_id, product_id, status, triggered_at, scheduled_for, applied_at, restore_scheduled_for, restored_at, notes FROM rule_application";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Rule>> {
    let sql = format!("{RULE_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Rule>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Active rules for one store and trigger, highest priority first.
pub async fn find_active_by_trigger(
    pool: &SqlitePool,
    store_id: i64,
    trigger: TriggerKind,
) -> RepoResult<Vec<Rule>> {
    let sql = format!(
        "{RULE_SELECT} WHERE store_id = ? AND is_active = 1 AND trigger_type = ? ORDER BY priority DESC, name"
    );
    let rows = sqlx::query_as::<_, Rule>(&sql)
        .bind(store_id)
        .bind(trigger.as_str())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: RuleDraft) -> RepoResult<Rule> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        r#"
        INSERT INTO rule (id, store_id, name, description, trigger_type, threshold, action_type, delay_minutes, auto_restore, restore_after_days, product_type_filter, vendor_filter, send_notification, is_active, priority, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 1, ?14, ?15, ?15)
        "#,
    )
    .bind(id)
    .bind(data.store_id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.trigger_type.as_str())
    .bind(data.threshold)
    .bind(data.action_type.as_str())
    .bind(data.delay_minutes)
    .bind(data.auto_restore)
    .bind(data.restore_after_days)
    .bind(&data.product_type_filter)
    .bind(&data.vendor_filter)
    .bind(data.send_notification)
    .bind(data.priority)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create rule".into()))
}

pub async fn set_active(pool: &SqlitePool, id: i64, is_active: bool) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE rule SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(is_active)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Rule {id} not found")));
    }
    Ok(())
}

// =============================================================================
// Rule Applications
// =============================================================================

pub async fn find_application(pool: &SqlitePool, id: i64) -> RepoResult<Option<RuleApplication>> {
    let sql = format!("{APPLICATION_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, RuleApplication>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Atomically create a `pending` application unless one already exists for
/// this `(rule, product)`. Returns `None` on the dedup hit; the partial
/// unique index absorbs the conflict, so concurrent schedulers cannot
/// double-insert.
pub async fn insert_application_if_absent(
    pool: &SqlitePool,
    rule_id: i64,
    product_id: i64,
    triggered_at: i64,
    scheduled_for: i64,
) -> RepoResult<Option<RuleApplication>> {
    let id = shared::util::snowflake_id();
    let rows = sqlx::query(
        r#"
        INSERT OR IGNORE INTO rule_application (id, rule_id, product_id, status, triggered_at, scheduled_for)
        VALUES (?1, ?2, ?3, 'pending', ?4, ?5)
        "#,
    )
    .bind(id)
    .bind(rule_id)
    .bind(product_id)
    .bind(triggered_at)
    .bind(scheduled_for)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Ok(None);
    }
    find_application(pool, id).await
}

/// Due work: `pending` applications whose time has come and whose rule is
/// still active. Items of deactivated rules are left untouched; they are
/// superseded by never being picked up.
pub async fn due_pending(pool: &SqlitePool, now: i64) -> RepoResult<Vec<RuleApplication>> {
    let rows = sqlx::query_as::<_, RuleApplication>(
        r#"
        SELECT a.id, a.rule_id, a.product_id, a.status, a.triggered_at, a.scheduled_for, a.applied_at, a.restore_scheduled_for, a.restored_at, a.notes
        FROM rule_application a
        JOIN rule r ON a.rule_id = r.id
        WHERE a.status = 'pending' AND a.scheduled_for <= ? AND r.is_active = 1
        ORDER BY a.scheduled_for
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Due restorations: `applied` applications whose restore time has come.
pub async fn due_restores(pool: &SqlitePool, now: i64) -> RepoResult<Vec<RuleApplication>> {
    let sql = format!(
        "{APPLICATION_SELECT} WHERE status = 'applied' AND restore_scheduled_for IS NOT NULL AND restore_scheduled_for <= ? ORDER BY restore_scheduled_for"
    );
    let rows = sqlx::query_as::<_, RuleApplication>(&sql)
        .bind(now)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Terminal failure for a work item that never got applied. Guarded on
/// `pending` so a racing successful apply is not overwritten.
pub async fn mark_application_failed(
    pool: &SqlitePool,
    id: i64,
    note: &str,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE rule_application SET status = 'failed', notes = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(note)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn applications_for_product(
    pool: &SqlitePool,
    product_id: i64,
) -> RepoResult<Vec<RuleApplication>> {
    let sql = format!("{APPLICATION_SELECT} WHERE product_id = ? ORDER BY triggered_at DESC");
    let rows = sqlx::query_as::<_, RuleApplication>(&sql)
        .bind(product_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
