//! Ingestion front door (C10): legacy/extended row schemas, dedup,
//! dispatch into the batch orchestrator (C8/enrichment).

pub mod file_formats;
pub mod rows;

use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

use crate::errors::{Error, Result};
use enrichment::{ProcessingRequest, Storage};

pub use file_formats::FileFormat;
pub use rows::{ExtendedRow, LegacyRow, RowError, RowSchema};

pub struct IngestionFrontDoor<S: Storage> {
    storage: std::sync::Arc<S>,
    cleanup_ttl_days: u64,
}

impl<S: Storage> IngestionFrontDoor<S> {
    pub fn new(storage: std::sync::Arc<S>, cleanup_ttl_days: u64) -> Self {
        Self { storage, cleanup_ttl_days }
    }

    /// Validates, infers missing fields, dedupes by `(name, unit)` within
    /// the batch, and submits the surviving rows as a new
    /// `ProcessingRequest`. Row-level errors are collected and returned
    /// alongside the request so valid rows still proceed.
    pub async fn ingest_rows(&self, rows: Vec<RowSchema>, supplier_id: &str, pricelist_id: Option<&str>) -> Result<(ProcessingRequest, Vec<RowError>)> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut items = Vec::new();
        let mut errors = Vec::new();

        for (index, row) in rows.into_iter().enumerate() {
            match row.normalize() {
                Ok(normalized) => {
                    let key = (normalized.name.clone(), normalized.unit.clone());
                    if !seen.insert(key) {
                        continue;
                    }
                    let material_key = format!("{supplier_id}:{}:{}", pricelist_id.unwrap_or(""), index);
                    let input = json!({
                        "supplier_id": supplier_id,
                        "pricelist_id": pricelist_id,
                        "name": normalized.name,
                        "unit": normalized.unit,
                        "use_category": normalized.use_category,
                        "sku": normalized.sku,
                        "unit_price": normalized.unit_price,
                        "unit_price_currency": normalized.unit_price_currency,
                    });
                    items.push((material_key, input));
                }
                Err(err) => errors.push(RowError { row_index: index, field: err.field, message: err.message }),
            }
        }

        if items.is_empty() {
            return Err(Error::validation("rows", "no valid rows survived validation and dedup"));
        }

        let ttl = Duration::from_secs(self.cleanup_ttl_days * 86_400);
        let request = self
            .storage
            .create_request(items, ttl)
            .await
            .map_err(|e| Error::internal(anyhow::anyhow!(e)))?;

        Ok((request, errors))
    }

    /// Converts raw decoded rows (from CSV/Excel, one JSON object per row)
    /// into typed `RowSchema`s before delegating to [`Self::ingest_rows`].
    /// Rows that don't even match a known shape are reported as row errors
    /// rather than aborting the whole batch.
    pub async fn ingest_decoded_rows(&self, raw_rows: Vec<serde_json::Value>, supplier_id: &str, pricelist_id: Option<&str>) -> Result<(ProcessingRequest, Vec<RowError>)> {
        let mut schemas = Vec::new();
        let mut errors = Vec::new();

        for (index, raw) in raw_rows.into_iter().enumerate() {
            match RowSchema::from_value(raw) {
                Ok(schema) => schemas.push(schema),
                Err(err) => errors.push(RowError {
                    row_index: index,
                    field: err.field,
                    message: err.message,
                }),
            }
        }

        let (request, mut normalize_errors) = self.ingest_rows(schemas, supplier_id, pricelist_id).await?;
        errors.append(&mut normalize_errors);
        Ok((request, errors))
    }
}
