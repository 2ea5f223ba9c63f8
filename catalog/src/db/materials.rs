//! Materials repository: the canonical catalog table plus the lexical
//! and fuzzy search queries the hybrid engine (C9) drives against it.

use chrono::Utc;
use uuid::Uuid;

use crate::store::{PostgresRelationalStore, StoreResult};

use super::models::Material;

pub async fn insert(store: &PostgresRelationalStore, material: &Material) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO materials (id, name, use_category, unit, sku, description, embedding, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(material.id)
    .bind(&material.name)
    .bind(&material.use_category)
    .bind(&material.unit)
    .bind(&material.sku)
    .bind(&material.description)
    .bind(&material.embedding)
    .bind(material.created_at)
    .bind(material.updated_at)
    .execute(store.pool())
    .await
    .map_err(super::classify_for_pool)?;
    Ok(())
}

pub async fn get(store: &PostgresRelationalStore, id: Uuid) -> StoreResult<Option<Material>> {
    sqlx::query_as::<_, Material>("SELECT * FROM materials WHERE id = $1")
        .bind(id)
        .fetch_optional(store.pool())
        .await
        .map_err(super::classify_for_pool)
}

pub async fn find_by_name_unit(store: &PostgresRelationalStore, name: &str, unit: &str) -> StoreResult<Option<Material>> {
    sqlx::query_as::<_, Material>("SELECT * FROM materials WHERE name = $1 AND unit = $2")
        .bind(name)
        .bind(unit)
        .fetch_optional(store.pool())
        .await
        .map_err(super::classify_for_pool)
}

pub async fn find_by_sku(store: &PostgresRelationalStore, sku: &str) -> StoreResult<Option<Material>> {
    sqlx::query_as::<_, Material>("SELECT * FROM materials WHERE sku = $1")
        .bind(sku)
        .fetch_optional(store.pool())
        .await
        .map_err(super::classify_for_pool)
}

pub async fn list(store: &PostgresRelationalStore, category: Option<&str>, skip: i64, limit: i64) -> StoreResult<Vec<Material>> {
    match category {
        Some(category) => {
            sqlx::query_as::<_, Material>("SELECT * FROM materials WHERE use_category = $1 ORDER BY name OFFSET $2 LIMIT $3")
                .bind(category)
                .bind(skip)
                .bind(limit)
                .fetch_all(store.pool())
                .await
        }
        None => {
            sqlx::query_as::<_, Material>("SELECT * FROM materials ORDER BY name OFFSET $1 LIMIT $2")
                .bind(skip)
                .bind(limit)
                .fetch_all(store.pool())
                .await
        }
    }
    .map_err(super::classify_for_pool)
}

pub async fn update(store: &PostgresRelationalStore, material: &Material) -> StoreResult<u64> {
    let result = sqlx::query(
        "UPDATE materials SET name = $2, use_category = $3, unit = $4, sku = $5, description = $6, embedding = $7, updated_at = $8 \
         WHERE id = $1",
    )
    .bind(material.id)
    .bind(&material.name)
    .bind(&material.use_category)
    .bind(&material.unit)
    .bind(&material.sku)
    .bind(&material.description)
    .bind(&material.embedding)
    .bind(Utc::now())
    .execute(store.pool())
    .await
    .map_err(super::classify_for_pool)?;
    Ok(result.rows_affected())
}

pub async fn delete(store: &PostgresRelationalStore, id: Uuid) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM materials WHERE id = $1")
        .bind(id)
        .execute(store.pool())
        .await
        .map_err(super::classify_for_pool)?;
    Ok(result.rows_affected())
}

/// Trigram + ILIKE lexical search over name/description/use_category,
/// ranked by similarity against `term`.
pub async fn lexical_search(store: &PostgresRelationalStore, term: &str, limit: i64) -> StoreResult<Vec<(Material, f32)>> {
    let rows = sqlx::query(
        "SELECT *, GREATEST(similarity(name, $1), similarity(description, $1), similarity(use_category, $1)) AS rank \
         FROM materials \
         WHERE name ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%' OR use_category ILIKE '%' || $1 || '%' \
            OR similarity(name, $1) > $2 \
         ORDER BY rank DESC, id ASC \
         LIMIT $3",
    )
    .bind(term)
    .bind(store.trigram_threshold)
    .bind(limit)
    .fetch_all(store.pool())
    .await
    .map_err(super::classify_for_pool)?;

    use sqlx::Row;
    rows.into_iter()
        .map(|row| {
            let rank: f32 = row.try_get("rank").unwrap_or(0.0);
            let material = <Material as sqlx::FromRow<sqlx::postgres::PgRow>>::from_row(&row).map_err(super::classify_for_pool)?;
            Ok((material, rank))
        })
        .collect()
}
