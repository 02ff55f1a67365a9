//! Inventory Repository — locations, levels, audit log

use super::{RepoError, RepoResult};
use shared::models::{InventoryLevel, InventoryLocation, InventoryLog, LogAction, LogEntry};
use sqlx::SqlitePool;

const LOCATION_SELECT: &str = "SELECT id, store_id, remote_id, name, is_active, created_at, updated_at FROM location";

const LEVEL_SELECT: &str = "SELECT id, variant_id, location_id, available, last_synced, updated_at FROM inventory_level";

const LOG_SELECT: &str = "SELECT id, store_id, product_id, variant_id, location_id, action, previous_value, new_value, previous_status, new_status, notes, created_at FROM inventory_log";

/// Get or create a location by `(store_id, remote_id)`; first reference
/// wins; a concurrent creator's row is simply returned.
pub async fn get_or_create_location(
    pool: &SqlitePool,
    store_id: i64,
    remote_id: i64,
    name: &str,
) -> RepoResult<InventoryLocation> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        r#"
        INSERT INTO location (id, store_id, remote_id, name, is_active, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
        ON CONFLICT (store_id, remote_id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(store_id)
    .bind(remote_id)
    .bind(name)
    .bind(now)
    .execute(pool)
    .await?;

    let sql = format!("{LOCATION_SELECT} WHERE store_id = ? AND remote_id = ?");
    sqlx::query_as::<_, InventoryLocation>(&sql)
        .bind(store_id)
        .bind(remote_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database(format!("Failed to create location {remote_id}")))
}

pub async fn find_locations(pool: &SqlitePool, store_id: i64) -> RepoResult<Vec<InventoryLocation>> {
    let sql = format!("{LOCATION_SELECT} WHERE store_id = ? ORDER BY name");
    let rows = sqlx::query_as::<_, InventoryLocation>(&sql)
        .bind(store_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Upsert a level by `(variant_id, location_id)`, returning the new row and
/// the previous available quantity (None on first sight).
pub async fn upsert_level(
    pool: &SqlitePool,
    variant_id: i64,
    location_id: i64,
    available: i64,
    now: i64,
) -> RepoResult<(InventoryLevel, Option<i64>)> {
    let previous: Option<(i64,)> = sqlx::query_as(
        "SELECT available FROM inventory_level WHERE variant_id = ? AND location_id = ?",
    )
    .bind(variant_id)
    .bind(location_id)
    .fetch_optional(pool)
    .await?;

    let id = shared::util::snowflake_id();
    sqlx::query(
        r#"
        INSERT INTO inventory_level (id, variant_id, location_id, available, last_synced, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        ON CONFLICT (variant_id, location_id)
        DO UPDATE SET available = excluded.available,
                      last_synced = excluded.last_synced,
                      updated_at = excluded.updated_at
        "#,
    )
    .bind(id)
    .bind(variant_id)
    .bind(location_id)
    .bind(available)
    .bind(now)
    .execute(pool)
    .await?;

    let sql = format!("{LEVEL_SELECT} WHERE variant_id = ? AND location_id = ?");
    let level = sqlx::query_as::<_, InventoryLevel>(&sql)
        .bind(variant_id)
        .bind(location_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to upsert inventory level".into()))?;

    Ok((level, previous.map(|(v,)| v)))
}

pub async fn find_levels_for_variant(
    pool: &SqlitePool,
    variant_id: i64,
) -> RepoResult<Vec<InventoryLevel>> {
    let sql = format!("{LEVEL_SELECT} WHERE variant_id = ?");
    let rows = sqlx::query_as::<_, InventoryLevel>(&sql)
        .bind(variant_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Total available across all variant/location pairs of one product.
/// A product with no recorded levels sums to 0 (out of stock).
pub async fn total_available(pool: &SqlitePool, product_id: i64) -> RepoResult<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(il.available), 0)
        FROM variant v
        LEFT JOIN inventory_level il ON il.variant_id = v.id
        WHERE v.product_id = ?
        "#,
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Append an audit entry. The log is append-only; nothing ever updates or
/// deletes these rows.
pub async fn append_log(
    pool: &SqlitePool,
    store_id: i64,
    action: LogAction,
    entry: LogEntry,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        r#"
        INSERT INTO inventory_log (id, store_id, product_id, variant_id, location_id, action, previous_value, new_value, previous_status, new_status, notes, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(id)
    .bind(store_id)
    .bind(entry.product_id)
    .bind(entry.variant_id)
    .bind(entry.location_id)
    .bind(action)
    .bind(entry.previous_value)
    .bind(entry.new_value)
    .bind(entry.previous_status)
    .bind(entry.new_status)
    .bind(entry.notes)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn logs_for_product(
    pool: &SqlitePool,
    product_id: i64,
) -> RepoResult<Vec<InventoryLog>> {
    let sql = format!("{LOG_SELECT} WHERE product_id = ? ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, InventoryLog>(&sql)
        .bind(product_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
