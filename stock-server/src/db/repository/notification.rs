//! Notification Repository

use super::{RepoError, RepoResult};
use shared::models::Notification;
use sqlx::SqlitePool;

const NOTIFICATION_SELECT: &str = "SELECT id, store_id, event_type, title, message, object_type, object_id, status, error_message, created_at, sent_at FROM notification";

/// Record a notification decision in `pending` state.
pub async fn create(
    pool: &SqlitePool,
    store_id: i64,
    event_type: &str,
    title: &str,
    message: &str,
    object_type: Option<&str>,
    object_id: Option<&str>,
) -> RepoResult<Notification> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        r#"
        INSERT INTO notification (id, store_id, event_type, title, message, object_type, object_id, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)
        "#,
    )
    .bind(id)
    .bind(store_id)
    .bind(event_type)
    .bind(title)
    .bind(message)
    .bind(object_type)
    .bind(object_id)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create notification".into()))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Notification>> {
    let sql = format!("{NOTIFICATION_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Notification>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_store(pool: &SqlitePool, store_id: i64) -> RepoResult<Vec<Notification>> {
    let sql = format!("{NOTIFICATION_SELECT} WHERE store_id = ? ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Notification>(&sql)
        .bind(store_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn mark_sent(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query("UPDATE notification SET status = 'sent', sent_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_failed(pool: &SqlitePool, id: i64, error_message: &str) -> RepoResult<()> {
    sqlx::query("UPDATE notification SET status = 'failed', error_message = ? WHERE id = ?")
        .bind(error_message)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
