//! RawProduct repository: supplier rows awaiting enrichment.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::store::{PostgresRelationalStore, StoreResult};

use super::models::RawProduct;

#[derive(Debug, Clone)]
pub struct NewRawProduct {
    pub supplier_id: String,
    pub pricelist_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub use_category: Option<String>,
    pub unit_price: Option<Decimal>,
    pub unit_price_currency: String,
    pub buy_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub unit_calc_price: Option<Decimal>,
    pub calc_unit: String,
    pub count: Decimal,
    pub date_price_change: Option<chrono::DateTime<Utc>>,
}

pub async fn insert(store: &PostgresRelationalStore, row: &NewRawProduct) -> StoreResult<RawProduct> {
    let now = Utc::now();
    sqlx::query_as::<_, RawProduct>(
        "INSERT INTO raw_products \
            (id, supplier_id, pricelist_id, name, sku, use_category, unit_price, unit_price_currency, \
             buy_price, sale_price, unit_calc_price, calc_unit, count, date_price_change, \
             is_processed, upload_date, created, modified) \
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,false,$15,$15,$15) \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&row.supplier_id)
    .bind(&row.pricelist_id)
    .bind(&row.name)
    .bind(&row.sku)
    .bind(&row.use_category)
    .bind(row.unit_price)
    .bind(&row.unit_price_currency)
    .bind(row.buy_price)
    .bind(row.sale_price)
    .bind(row.unit_calc_price)
    .bind(&row.calc_unit)
    .bind(row.count)
    .bind(row.date_price_change)
    .bind(now)
    .fetch_one(store.pool())
    .await
    .map_err(super::classify_for_pool)
}

pub async fn mark_processed(store: &PostgresRelationalStore, id: Uuid) -> StoreResult<u64> {
    let result = sqlx::query("UPDATE raw_products SET is_processed = true, modified = $2 WHERE id = $1")
        .bind(id)
        .bind(Utc::now())
        .execute(store.pool())
        .await
        .map_err(super::classify_for_pool)?;
    Ok(result.rows_affected())
}

pub async fn find_unprocessed_by_supplier(
    store: &PostgresRelationalStore,
    supplier_id: &str,
    pricelist_id: Option<&str>,
) -> StoreResult<Vec<RawProduct>> {
    sqlx::query_as::<_, RawProduct>(
        "SELECT * FROM raw_products WHERE supplier_id = $1 AND ($2::text IS NULL OR pricelist_id = $2) AND is_processed = false",
    )
    .bind(supplier_id)
    .bind(pricelist_id)
    .fetch_all(store.pool())
    .await
    .map_err(super::classify_for_pool)
}

/// Supports idempotent re-ingest (§8): a prior row with the same
/// supplier/pricelist/name/calc_unit means this batch already ran.
pub async fn exists_for_batch(store: &PostgresRelationalStore, supplier_id: &str, pricelist_id: Option<&str>, name: &str, calc_unit: &str) -> StoreResult<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM raw_products WHERE supplier_id = $1 AND ($2::text IS NULL OR pricelist_id = $2) AND name = $3 AND calc_unit = $4 LIMIT 1",
    )
    .bind(supplier_id)
    .bind(pricelist_id)
    .bind(name)
    .bind(calc_unit)
    .fetch_optional(store.pool())
    .await
    .map_err(super::classify_for_pool)?;
    Ok(row.is_some())
}
