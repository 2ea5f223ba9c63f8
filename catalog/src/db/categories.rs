//! Category reference repository (filter surface, §3). Deletion is by id only.

use uuid::Uuid;

use crate::store::{PostgresRelationalStore, StoreResult};

use super::models::Category;

pub async fn list(store: &PostgresRelationalStore) -> StoreResult<Vec<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(store.pool())
        .await
        .map_err(super::classify_for_pool)
}

pub async fn find_by_name(store: &PostgresRelationalStore, name: &str) -> StoreResult<Option<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(store.pool())
        .await
        .map_err(super::classify_for_pool)
}

pub async fn insert(store: &PostgresRelationalStore, name: &str, description: Option<&str>) -> StoreResult<Category> {
    sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, description) VALUES ($1, $2, $3) RETURNING *")
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(store.pool())
        .await
        .map_err(super::classify_for_pool)
}

pub async fn delete(store: &PostgresRelationalStore, id: Uuid) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(store.pool())
        .await
        .map_err(super::classify_for_pool)?;
    Ok(result.rows_affected())
}
