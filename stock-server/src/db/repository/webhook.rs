//! Store Webhook Repository

use super::RepoResult;
use shared::models::StoreWebhook;
use sqlx::SqlitePool;

const WEBHOOK_SELECT: &str =
    "SELECT id, store_id, remote_id, topic, address, created_at FROM store_webhook";

/// Upsert by `(store_id, topic)`: re-registering a topic refreshes the
/// remote id and address.
pub async fn upsert(
    pool: &SqlitePool,
    store_id: i64,
    remote_id: i64,
    topic: &str,
    address: &str,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        r#"
        INSERT INTO store_webhook (id, store_id, remote_id, topic, address, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (store_id, topic)
        DO UPDATE SET remote_id = excluded.remote_id,
                      address = excluded.address
        "#,
    )
    .bind(id)
    .bind(store_id)
    .bind(remote_id)
    .bind(topic)
    .bind(address)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_store(pool: &SqlitePool, store_id: i64) -> RepoResult<Vec<StoreWebhook>> {
    let sql = format!("{WEBHOOK_SELECT} WHERE store_id = ? ORDER BY topic");
    let rows = sqlx::query_as::<_, StoreWebhook>(&sql)
        .bind(store_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
