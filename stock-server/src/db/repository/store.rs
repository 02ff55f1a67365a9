//! Store Repository

use super::{RepoError, RepoResult};
use shared::models::{Store, SyncStatus};
use sqlx::SqlitePool;

const STORE_SELECT: &str = "SELECT id, shop_domain, shop_name, access_token, is_active, sync_status, last_sync_at, created_at, updated_at FROM store";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Store>> {
    let sql = format!("{STORE_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Store>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_domain(pool: &SqlitePool, shop_domain: &str) -> RepoResult<Option<Store>> {
    let sql = format!("{STORE_SELECT} WHERE shop_domain = ?");
    let row = sqlx::query_as::<_, Store>(&sql)
        .bind(shop_domain)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_active(pool: &SqlitePool) -> RepoResult<Vec<Store>> {
    let sql = format!("{STORE_SELECT} WHERE is_active = 1 ORDER BY shop_domain");
    let rows = sqlx::query_as::<_, Store>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Register a store after a successful install handshake.
///
/// Upserts by `shop_domain`: a reinstall refreshes the credential and
/// reactivates the existing row instead of creating a second tenant.
pub async fn install(
    pool: &SqlitePool,
    shop_domain: &str,
    shop_name: Option<&str>,
    access_token: &str,
) -> RepoResult<Store> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        r#"
        INSERT INTO store (id, shop_domain, shop_name, access_token, is_active, sync_status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, 1, 'pending', ?5, ?5)
        ON CONFLICT (shop_domain)
        DO UPDATE SET shop_name = COALESCE(excluded.shop_name, store.shop_name),
                      access_token = excluded.access_token,
                      is_active = 1,
                      updated_at = excluded.updated_at
        "#,
    )
    .bind(id)
    .bind(shop_domain)
    .bind(shop_name)
    .bind(access_token)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_domain(pool, shop_domain)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to install store".into()))
}

/// Uninstall: clear the credential and deactivate. The row and its mirrored
/// catalog are kept for history.
pub async fn deactivate(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE store SET access_token = NULL, is_active = 0, updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Store {id} not found")));
    }
    Ok(())
}

/// Set sync status. Only the reconciliation engine calls this.
pub async fn set_sync_status(pool: &SqlitePool, id: i64, status: SyncStatus) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query("UPDATE store SET sync_status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark a completed sync pass: status `success` + fresh last_sync_at.
pub async fn mark_sync_success(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<()> {
    sqlx::query(
        "UPDATE store SET sync_status = 'success', last_sync_at = ?1, updated_at = ?1 WHERE id = ?2",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
