//! Reference surface: categories and units CRUD, deletion by id only
//! (§6, §9 REDESIGN FLAGS).

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use uuid::Uuid;

use crate::api::models::reference::{CategoryResponse, CreateCategoryRequest, CreateUnitRequest, UnitResponse};
use crate::app_state::AppState;
use crate::db;
use crate::errors::{Error, Result};

use super::{created, ok};

pub async fn list_categories(State(state): State<AppState>) -> Result<Response> {
    let categories = db::categories::list(&state.fabric.relational).await?;
    Ok(ok(categories.into_iter().map(CategoryResponse::from).collect::<Vec<_>>()))
}

pub async fn create_category(State(state): State<AppState>, Json(request): Json<CreateCategoryRequest>) -> Result<Response> {
    if db::categories::find_by_name(&state.fabric.relational, &request.name).await?.is_some() {
        return Err(Error::Conflict {
            message: format!("category {:?} already exists", request.name),
        });
    }
    let category = db::categories::insert(&state.fabric.relational, &request.name, request.description.as_deref()).await?;
    Ok(created(CategoryResponse::from(category)))
}

/// Id-only deletion. Name-keyed deletes are rejected rather than
/// silently falling back to a destructive lookup (§9).
pub async fn delete_category(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let rows = db::categories::delete(&state.fabric.relational, id).await?;
    if rows == 0 {
        return Err(Error::not_found("category", id.to_string()));
    }
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}

pub async fn list_units(State(state): State<AppState>) -> Result<Response> {
    let units = db::units::list(&state.fabric.relational).await?;
    Ok(ok(units.into_iter().map(UnitResponse::from).collect::<Vec<_>>()))
}

pub async fn create_unit(State(state): State<AppState>, Json(request): Json<CreateUnitRequest>) -> Result<Response> {
    if db::units::find_by_name(&state.fabric.relational, &request.name).await?.is_some() {
        return Err(Error::Conflict {
            message: format!("unit {:?} already exists", request.name),
        });
    }
    let unit = db::units::insert(&state.fabric.relational, &request.name, request.description.as_deref()).await?;
    Ok(created(UnitResponse::from(unit)))
}

pub async fn delete_unit(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let rows = db::units::delete(&state.fabric.relational, id).await?;
    if rows == 0 {
        return Err(Error::not_found("unit", id.to_string()));
    }
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}
