//! Store routing: primary -> fallback ordering per logical operation,
//! idempotent write replay, and the degraded processing-progress path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::{self, Material};
use crate::store::{CacheStore, PostgresRelationalStore, StoreError, StoreResult, VectorFilter, VectorPoint, VectorStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    VectorSearch,
    LexicalSearch,
    MaterialRead,
    MaterialWrite,
    ProcessingProgress,
    Cache,
}

/// Per-adapter call deadlines (§5); total deadline is enforced by the
/// caller composing `remaining - overhead` into nested calls.
#[derive(Debug, Clone)]
pub struct Deadlines(HashMap<OperationKind, Duration>);

impl Default for Deadlines {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert(OperationKind::VectorSearch, Duration::from_secs(2));
        map.insert(OperationKind::LexicalSearch, Duration::from_secs(2));
        map.insert(OperationKind::MaterialRead, Duration::from_secs(2));
        map.insert(OperationKind::MaterialWrite, Duration::from_secs(2));
        map.insert(OperationKind::ProcessingProgress, Duration::from_secs(2));
        map.insert(OperationKind::Cache, Duration::from_millis(500));
        Self(map)
    }
}

impl Deadlines {
    pub fn for_kind(&self, kind: OperationKind) -> Duration {
        self.0.get(&kind).copied().unwrap_or(Duration::from_secs(2))
    }
}

const PROCESSING_RECORDS_COLLECTION: &str = "processing_records";

/// The single façade the rest of the service goes through for store
/// access. Holds one binding per store kind; routing policy per
/// operation lives in the methods below rather than as generic
/// data, since each operation kind composes the stores differently.
pub struct DataFabric {
    pub vector: Arc<dyn VectorStore>,
    pub relational: Arc<PostgresRelationalStore>,
    pub cache: Arc<dyn CacheStore>,
    pub deadlines: Deadlines,
    /// Set once relational has been observed unavailable for
    /// processing-progress operations; surfaced in the detailed health
    /// response per the Qdrant-only degraded-mode warning requirement.
    processing_degraded: AtomicBool,
}

impl DataFabric {
    pub fn new(vector: Arc<dyn VectorStore>, relational: Arc<PostgresRelationalStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            vector,
            relational,
            cache,
            deadlines: Deadlines::default(),
            processing_degraded: AtomicBool::new(false),
        }
    }

    pub fn is_processing_degraded(&self) -> bool {
        self.processing_degraded.load(Ordering::Relaxed)
    }

    /// Write-primary-then-replay: the vector point is upserted first
    /// (the SKU stage already has the embedding in hand), then the
    /// relational row is inserted. If the relational insert fails, the
    /// vector point is a compensating delete away from consistency; the
    /// delete is attempted immediately and, on its own failure, left for
    /// the reaper to reconcile on its next cycle.
    pub async fn persist_material(&self, material: &Material) -> StoreResult<()> {
        let point = VectorPoint {
            id: material.id,
            vector: material.embedding.clone(),
            payload: serde_json::json!({
                "name": material.name,
                "use_category": material.use_category,
                "unit": material.unit,
                "sku": material.sku,
            }),
        };
        self.vector.upsert("materials", vec![point]).await?;

        if let Err(err) = db::materials::insert(&self.relational, material).await {
            if let Err(compensate_err) = self.vector.delete("materials", material.id).await {
                tracing::warn!(
                    material_id = %material.id,
                    error = %compensate_err,
                    "compensating vector delete failed after relational insert failure; leaving for reaper"
                );
            }
            return Err(err);
        }

        Ok(())
    }

    pub async fn vector_search(&self, collection: &str, query_vector: &[f32], limit: usize, filter: Option<&VectorFilter>) -> StoreResult<Vec<crate::store::VectorHit>> {
        let deadline = self.deadlines.for_kind(OperationKind::VectorSearch);
        tokio::time::timeout(deadline, self.vector.search(collection, query_vector, limit, filter))
            .await
            .map_err(|_| StoreError::Timeout {
                store: "vector",
                elapsed_ms: deadline.as_millis() as u64,
            })?
    }

    pub async fn lexical_search(&self, term: &str, limit: i64) -> StoreResult<Vec<(Material, f32)>> {
        let deadline = self.deadlines.for_kind(OperationKind::LexicalSearch);
        tokio::time::timeout(deadline, db::materials::lexical_search(&self.relational, term, limit))
            .await
            .map_err(|_| StoreError::Timeout {
                store: "relational",
                elapsed_ms: deadline.as_millis() as u64,
            })?
    }

    /// Records processing progress against the degraded vector-backed
    /// collection; used only once relational has been observed
    /// unavailable (§4.2).
    pub async fn write_progress_degraded(&self, record_id: Uuid, payload: serde_json::Value) -> StoreResult<()> {
        self.write_degraded(PROCESSING_RECORDS_COLLECTION, record_id, payload).await
    }

    /// Generic degraded read/write, for callers that need a collection
    /// other than the per-record one above (e.g. request-level aggregates).
    /// Marks the fabric degraded as a side effect of any write.
    pub async fn write_degraded(&self, collection: &str, record_id: Uuid, payload: serde_json::Value) -> StoreResult<()> {
        self.processing_degraded.store(true, Ordering::Relaxed);
        self.vector
            .upsert(
                collection,
                vec![VectorPoint {
                    id: record_id,
                    vector: vec![0.0; 1],
                    payload,
                }],
            )
            .await
    }

    pub async fn read_degraded(&self, collection: &str, record_id: Uuid) -> StoreResult<Option<serde_json::Value>> {
        Ok(self.vector.get(collection, record_id).await?.map(|point| point.payload))
    }

    /// Read-back of progress in degraded mode is a filtered scan with
    /// aggregation: correct, but O(N) in records (§4.2).
    pub async fn scan_progress_degraded(&self, filter: VectorFilter, limit: usize) -> StoreResult<Vec<serde_json::Value>> {
        let hits = self.vector.search(PROCESSING_RECORDS_COLLECTION, &[0.0; 1], limit, Some(&filter)).await?;
        Ok(hits.into_iter().map(|hit| hit.payload).collect())
    }

    pub fn clear_processing_degraded(&self) {
        self.processing_degraded.store(false, Ordering::Relaxed);
    }

    pub async fn health(&self) -> HashMap<&'static str, crate::store::HealthStatus> {
        let mut out = HashMap::new();
        out.insert("vector", self.vector.health_check().await);
        out.insert("relational", self.relational.health_check().await);
        out.insert("cache", self.cache.health_check().await);
        out
    }
}
