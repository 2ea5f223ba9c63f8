//! Request/response DTOs for the Materials surface (§6).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Material;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMaterialRequest {
    pub name: String,
    pub use_category: String,
    pub unit: String,
    pub sku: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMaterialRequest {
    pub name: Option<String>,
    pub use_category: Option<String>,
    pub unit: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchCreateMaterialsRequest {
    pub items: Vec<CreateMaterialRequest>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    100
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterialResponse {
    pub id: Uuid,
    pub name: String,
    pub use_category: String,
    pub unit: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Material> for MaterialResponse {
    fn from(material: Material) -> Self {
        Self {
            id: material.id,
            name: material.name,
            use_category: material.use_category,
            unit: material.unit,
            sku: material.sku,
            description: material.description,
            created_at: material.created_at,
            updated_at: material.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchCreateSummary {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<BatchItemError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItemError {
    pub index: usize,
    pub message: String,
}
