//! Request/response DTOs for the Reference surface: categories and
//! units CRUD, deletion by id only (§9 REDESIGN FLAGS).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Category, Unit};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUnitRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<Unit> for UnitResponse {
    fn from(unit: Unit) -> Self {
        Self {
            id: unit.id,
            name: unit.name,
            description: unit.description,
        }
    }
}
