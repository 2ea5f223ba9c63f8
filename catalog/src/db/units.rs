//! Unit reference repository (filter surface, §3). Deletion is by id only.

use uuid::Uuid;

use crate::store::{PostgresRelationalStore, StoreResult};

use super::models::Unit;

pub async fn list(store: &PostgresRelationalStore) -> StoreResult<Vec<Unit>> {
    sqlx::query_as::<_, Unit>("SELECT * FROM units ORDER BY name")
        .fetch_all(store.pool())
        .await
        .map_err(super::classify_for_pool)
}

pub async fn find_by_name(store: &PostgresRelationalStore, name: &str) -> StoreResult<Option<Unit>> {
    sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE name = $1")
        .bind(name)
        .fetch_optional(store.pool())
        .await
        .map_err(super::classify_for_pool)
}

pub async fn insert(store: &PostgresRelationalStore, name: &str, description: Option<&str>) -> StoreResult<Unit> {
    sqlx::query_as::<_, Unit>("INSERT INTO units (id, name, description) VALUES ($1, $2, $3) RETURNING *")
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(store.pool())
        .await
        .map_err(super::classify_for_pool)
}

pub async fn delete(store: &PostgresRelationalStore, id: Uuid) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM units WHERE id = $1")
        .bind(id)
        .execute(store.pool())
        .await
        .map_err(super::classify_for_pool)?;
    Ok(result.rows_affected())
}
