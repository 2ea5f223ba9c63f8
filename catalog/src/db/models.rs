//! Row types for the relational schema (§3).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub use_category: String,
    pub unit: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawProduct {
    pub id: Uuid,
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
    pub date_price_change: Option<DateTime<Utc>>,
    pub is_processed: bool,
    pub upload_date: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Unit {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}
