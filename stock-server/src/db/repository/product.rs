//! Product + Variant Repository
//!
//! Upserts are keyed by the natural keys `(store_id, remote_id)` and
//! `(product_id, remote_id)` so reconciliation converges on re-runs.
//! Visibility fields are deliberately absent from the upsert SET list;
//! they belong to the rule state machine.

use super::{RepoError, RepoResult};
use shared::models::{Product, ProductVariant};
use shared::remote::{RemoteProduct, RemoteVariant, parse_remote_datetime};
use sqlx::SqlitePool;

const PRODUCT_SELECT: &str = "SELECT id, store_id, remote_id, title, handle, product_type, vendor, status, published_at, is_visible, hidden_at, scheduled_return, last_synced, created_at, updated_at FROM product";

const VARIANT_SELECT: &str = "SELECT id, product_id, remote_id, title, sku, price, position, inventory_item_id, created_at, updated_at FROM variant";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_remote_id(
    pool: &SqlitePool,
    store_id: i64,
    remote_id: i64,
) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE store_id = ? AND remote_id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(store_id)
        .bind(remote_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_store(pool: &SqlitePool, store_id: i64) -> RepoResult<Vec<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE store_id = ? ORDER BY title");
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(store_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Upsert a product from its remote payload.
pub async fn upsert_from_remote(
    pool: &SqlitePool,
    store_id: i64,
    remote: &RemoteProduct,
    now: i64,
) -> RepoResult<Product> {
    let id = shared::util::snowflake_id();
    let published_at = parse_remote_datetime(remote.published_at.as_deref());
    sqlx::query(
        r#"
        INSERT INTO product (id, store_id, remote_id, title, handle, product_type, vendor, status, published_at, last_synced, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, ?10)
        ON CONFLICT (store_id, remote_id)
        DO UPDATE SET title = excluded.title,
                      handle = excluded.handle,
                      product_type = excluded.product_type,
                      vendor = excluded.vendor,
                      status = excluded.status,
                      published_at = excluded.published_at,
                      last_synced = excluded.last_synced,
                      updated_at = excluded.updated_at
        "#,
    )
    .bind(id)
    .bind(store_id)
    .bind(remote.id)
    .bind(&remote.title)
    .bind(&remote.handle)
    .bind(&remote.product_type)
    .bind(&remote.vendor)
    .bind(&remote.status)
    .bind(published_at)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_remote_id(pool, store_id, remote.id)
        .await?
        .ok_or_else(|| RepoError::Database(format!("Failed to upsert product {}", remote.id)))
}

pub async fn find_variants(pool: &SqlitePool, product_id: i64) -> RepoResult<Vec<ProductVariant>> {
    let sql = format!("{VARIANT_SELECT} WHERE product_id = ? ORDER BY position");
    let rows = sqlx::query_as::<_, ProductVariant>(&sql)
        .bind(product_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Look up a variant by its remote inventory-item reference, scoped to one
/// store (the webhook payload only carries the inventory_item_id).
pub async fn find_variant_by_inventory_item(
    pool: &SqlitePool,
    store_id: i64,
    inventory_item_id: i64,
) -> RepoResult<Option<ProductVariant>> {
    let rows = sqlx::query_as::<_, ProductVariant>(
        r#"
        SELECT v.id, v.product_id, v.remote_id, v.title, v.sku, v.price, v.position, v.inventory_item_id, v.created_at, v.updated_at
        FROM variant v
        JOIN product p ON v.product_id = p.id
        WHERE p.store_id = ? AND v.inventory_item_id = ?
        "#,
    )
    .bind(store_id)
    .bind(inventory_item_id)
    .fetch_optional(pool)
    .await?;
    Ok(rows)
}

/// Upsert a variant from its remote payload.
pub async fn upsert_variant_from_remote(
    pool: &SqlitePool,
    product_id: i64,
    remote: &RemoteVariant,
    now: i64,
) -> RepoResult<ProductVariant> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        r#"
        INSERT INTO variant (id, product_id, remote_id, title, sku, price, position, inventory_item_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        ON CONFLICT (product_id, remote_id)
        DO UPDATE SET title = excluded.title,
                      sku = excluded.sku,
                      price = excluded.price,
                      position = excluded.position,
                      inventory_item_id = excluded.inventory_item_id,
                      updated_at = excluded.updated_at
        "#,
    )
    .bind(id)
    .bind(product_id)
    .bind(remote.id)
    .bind(&remote.title)
    .bind(&remote.sku)
    .bind(remote.price_f64())
    .bind(remote.position)
    .bind(remote.inventory_item_id)
    .bind(now)
    .execute(pool)
    .await?;

    let sql = format!("{VARIANT_SELECT} WHERE product_id = ? AND remote_id = ?");
    sqlx::query_as::<_, ProductVariant>(&sql)
        .bind(product_id)
        .bind(remote.id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database(format!("Failed to upsert variant {}", remote.id)))
}

/// Bump `updated_at` on products the current sync pass did not see.
/// They are marked "not currently synced" rather than deleted, preserving
/// visibility history and the audit trail.
pub async fn touch_unseen(
    pool: &SqlitePool,
    store_id: i64,
    seen_remote_ids: &[i64],
    now: i64,
) -> RepoResult<u64> {
    if seen_remote_ids.is_empty() {
        let rows = sqlx::query("UPDATE product SET updated_at = ? WHERE store_id = ?")
            .bind(now)
            .bind(store_id)
            .execute(pool)
            .await?;
        return Ok(rows.rows_affected());
    }

    let placeholders = vec!["?"; seen_remote_ids.len()].join(", ");
    let sql = format!(
        "UPDATE product SET updated_at = ? WHERE store_id = ? AND remote_id NOT IN ({placeholders})"
    );
    let mut query = sqlx::query(&sql).bind(now).bind(store_id);
    for remote_id in seen_remote_ids {
        query = query.bind(remote_id);
    }
    let rows = query.execute(pool).await?;
    Ok(rows.rows_affected())
}

/// Same as [`touch_unseen`] for one product's variants.
pub async fn touch_unseen_variants(
    pool: &SqlitePool,
    product_id: i64,
    seen_remote_ids: &[i64],
    now: i64,
) -> RepoResult<u64> {
    if seen_remote_ids.is_empty() {
        let rows = sqlx::query("UPDATE variant SET updated_at = ? WHERE product_id = ?")
            .bind(now)
            .bind(product_id)
            .execute(pool)
            .await?;
        return Ok(rows.rows_affected());
    }

    let placeholders = vec!["?"; seen_remote_ids.len()].join(", ");
    let sql = format!(
        "UPDATE variant SET updated_at = ? WHERE product_id = ? AND remote_id NOT IN ({placeholders})"
    );
    let mut query = sqlx::query(&sql).bind(now).bind(product_id);
    for remote_id in seen_remote_ids {
        query = query.bind(remote_id);
    }
    let rows = query.execute(pool).await?;
    Ok(rows.rows_affected())
}
