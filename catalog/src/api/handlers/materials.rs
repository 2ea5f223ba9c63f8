//! Materials CRUD + batch create (§6).

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::api::models::materials::{BatchCreateMaterialsRequest, BatchCreateSummary, BatchItemError, CreateMaterialRequest, MaterialResponse, UpdateMaterialRequest};
use crate::api::models::pagination::{Page, SkipLimitQuery};
use crate::app_state::AppState;
use crate::db::{self, Material};
use crate::errors::{Error, Result};
use crate::sku::new_material_id;
use crate::store::VectorStore;

use super::{created, ok};

const MAX_BATCH_ITEMS: usize = 1000;
const MAX_BATCH_SIZE: usize = 500;

async fn embed_for(state: &AppState, material: &CreateMaterialRequest) -> Result<Vec<f32>> {
    let text = format!("{} {} {}", material.name, material.use_category, material.unit);
    let embedding = state.ai.embed(&text).await?;
    Ok(embedding.vector)
}

pub async fn create(State(state): State<AppState>, Json(request): Json<CreateMaterialRequest>) -> Result<Response> {
    let embedding = embed_for(&state, &request).await?;
    let now = Utc::now();
    let material = Material {
        id: new_material_id(),
        name: request.name,
        use_category: request.use_category,
        unit: request.unit,
        sku: request.sku,
        description: request.description,
        embedding,
        created_at: now,
        updated_at: now,
    };

    state.fabric.persist_material(&material).await?;
    state.search.invalidate_all().await?;

    Ok(created(MaterialResponse::from(material)))
}

pub async fn batch_create(State(state): State<AppState>, Json(request): Json<BatchCreateMaterialsRequest>) -> Result<Response> {
    if request.items.len() > MAX_BATCH_ITEMS {
        return Err(Error::validation("items", format!("batch accepts at most {MAX_BATCH_ITEMS} items, got {}", request.items.len())));
    }
    if request.batch_size == 0 || request.batch_size > MAX_BATCH_SIZE {
        return Err(Error::validation("batch_size", format!("batch_size must be in [1, {MAX_BATCH_SIZE}], got {}", request.batch_size)));
    }

    let mut succeeded = 0usize;
    let mut errors = Vec::new();

    for (index, item) in request.items.iter().enumerate() {
        let outcome: Result<()> = async {
            let embedding = embed_for(&state, item).await?;
            let now = Utc::now();
            let material = Material {
                id: new_material_id(),
                name: item.name.clone(),
                use_category: item.use_category.clone(),
                unit: item.unit.clone(),
                sku: item.sku.clone(),
                description: item.description.clone(),
                embedding,
                created_at: now,
                updated_at: now,
            };
            state.fabric.persist_material(&material).await?;
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => succeeded += 1,
            Err(err) => errors.push(BatchItemError { index, message: err.to_string() }),
        }
    }

    if succeeded > 0 {
        state.search.invalidate_all().await?;
    }

    let summary = BatchCreateSummary {
        submitted: request.items.len(),
        succeeded,
        failed: errors.len(),
        errors,
    };

    Ok(created(summary))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let material = db::materials::get(&state.fabric.relational, id).await?.ok_or_else(|| Error::not_found("material", id.to_string()))?;
    Ok(ok(MaterialResponse::from(material)))
}

pub async fn list(State(state): State<AppState>, Query(query): Query<SkipLimitQuery>) -> Result<Response> {
    query.validate().map_err(|message| Error::validation("limit", message))?;
    let materials = db::materials::list(&state.fabric.relational, query.category.as_deref(), query.skip as i64, query.limit as i64).await?;
    let total = materials.len() as u64;
    let page = Page {
        items: materials.into_iter().map(MaterialResponse::from).collect(),
        total,
        skip: query.skip,
        limit: query.limit,
    };
    Ok(ok(page))
}

pub async fn update(State(state): State<AppState>, Path(id): Path<Uuid>, Json(request): Json<UpdateMaterialRequest>) -> Result<Response> {
    let mut material = db::materials::get(&state.fabric.relational, id).await?.ok_or_else(|| Error::not_found("material", id.to_string()))?;

    let mut text_changed = false;
    if let Some(name) = request.name {
        material.name = name;
        text_changed = true;
    }
    if let Some(use_category) = request.use_category {
        material.use_category = use_category;
        text_changed = true;
    }
    if let Some(unit) = request.unit {
        material.unit = unit;
        text_changed = true;
    }
    if let Some(sku) = request.sku {
        material.sku = Some(sku);
    }
    if let Some(description) = request.description {
        material.description = Some(description);
    }

    if text_changed {
        let text = format!("{} {} {}", material.name, material.use_category, material.unit);
        material.embedding = state.ai.embed(&text).await?.vector;
    }
    material.updated_at = Utc::now();

    db::materials::update(&state.fabric.relational, &material).await?;
    state.fabric.vector.upsert(
        "materials",
        vec![crate::store::VectorPoint {
            id: material.id,
            vector: material.embedding.clone(),
            payload: serde_json::json!({
                "name": material.name,
                "use_category": material.use_category,
                "unit": material.unit,
                "sku": material.sku,
            }),
        }],
    ).await?;
    state.search.invalidate_all().await?;

    Ok(ok(MaterialResponse::from(material)))
}

/// Delete is idempotent at the effect level, never at the response level:
/// the first call that actually removes the row is 2xx, every call after
/// that a 404 (§8).
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let rows = db::materials::delete(&state.fabric.relational, id).await?;
    if rows == 0 {
        return Err(Error::not_found("material", id.to_string()));
    }
    let _ = state.fabric.vector.delete("materials", id).await;
    state.search.invalidate_all().await?;
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}
