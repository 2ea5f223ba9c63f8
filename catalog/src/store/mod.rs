//! Store adapters (C1): uniform contracts for the vector store, the
//! relational store, and the cache, each with a health check.
//!
//! Adapters distinguish `ConnectionError`/`OperationTimeout` (retryable,
//! fall-through candidates for the fallback fabric) from `QueryError` and
//! generic `DatabaseError` (surfaced immediately). No adapter retries
//! internally — that is the fabric's job (§4.2).

pub mod cache_moka;
pub mod relational_postgres;
pub mod vector_qdrant;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error as ThisError;

pub use cache_moka::MokaCacheStore;
pub use relational_postgres::PostgresRelationalStore;
pub use vector_qdrant::QdrantVectorStore;

#[derive(Debug, ThisError, Clone)]
pub enum StoreError {
    #[error("{store} connection error: {message}")]
    Connection { store: &'static str, message: String },

    #[error("{store} query error: {message}")]
    Query { store: &'static str, message: String },

    #[error("{store} operation timed out after {elapsed_ms}ms")]
    Timeout { store: &'static str, elapsed_ms: u64 },

    #[error("{store} error: {message}")]
    Database { store: &'static str, message: String },
}

impl StoreError {
    /// Only these two kinds are eligible fall-through candidates for the
    /// fallback fabric; `Query`/`Database` surface immediately.
    pub fn is_fallthrough_eligible(&self) -> bool {
        matches!(self, StoreError::Connection { .. } | StoreError::Timeout { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Connection { .. } => "UNAVAILABLE",
            StoreError::Query { .. } => "VALIDATION_ERROR",
            StoreError::Timeout { .. } => "TIMEOUT",
            StoreError::Database { .. } => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Query { .. } => StatusCode::BAD_REQUEST,
            StoreError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            StoreError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub latency_ms: u64,
    pub extra: HashMap<String, serde_json::Value>,
}

impl HealthStatus {
    pub fn healthy(latency: Duration) -> Self {
        Self {
            status: HealthState::Healthy,
            latency_ms: latency.as_millis() as u64,
            extra: HashMap::new(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        let mut extra = HashMap::new();
        extra.insert("message".to_string(), serde_json::Value::String(message.into()));
        Self {
            status: HealthState::Unavailable,
            latency_ms: 0,
            extra,
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A conjunction of equality / in-set / range predicates over vector
/// payload keys, applied server-side by the vector store adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorFilter {
    pub equals: HashMap<String, serde_json::Value>,
    pub in_set: HashMap<String, Vec<serde_json::Value>>,
    pub range: HashMap<String, RangePredicate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RangePredicate {
    pub gte: Option<serde_json::Value>,
    pub lte: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: uuid::Uuid,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct VectorHit {
    pub id: uuid::Uuid,
    /// Cosine score in [-1, 1]; callers map `(s + 1) / 2` when a [0,1] score is needed.
    pub score: f32,
    pub payload: serde_json::Value,
}

impl VectorHit {
    pub fn normalized_score(&self) -> f32 {
        (self.score + 1.0) / 2.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchUpsertReport {
    pub upserted: usize,
    pub failed_indices: Vec<usize>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(&self, collection: &str, query_vector: &[f32], limit: usize, filter: Option<&VectorFilter>) -> StoreResult<Vec<VectorHit>>;

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> StoreResult<()>;

    async fn delete(&self, collection: &str, id: uuid::Uuid) -> StoreResult<()>;

    async fn batch_upsert(&self, collection: &str, points: Vec<VectorPoint>, batch_size: usize) -> StoreResult<BatchUpsertReport>;

    async fn get(&self, collection: &str, id: uuid::Uuid) -> StoreResult<Option<VectorPoint>>;

    async fn health_check(&self) -> HealthStatus;
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<()>;
    async fn delete(&self, key: &str) -> StoreResult<bool>;
    async fn exists(&self, key: &str) -> StoreResult<bool>;
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>>;
    async fn mset(&self, entries: Vec<(String, Vec<u8>)>, ttl: Option<Duration>) -> StoreResult<()>;

    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> StoreResult<()>;
    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>>;
    async fn hdel(&self, key: &str, field: &str) -> StoreResult<bool>;

    async fn lpush(&self, key: &str, value: Vec<u8>, max_len: Option<usize>) -> StoreResult<()>;
    async fn lrange(&self, key: &str, limit: usize) -> StoreResult<Vec<Vec<u8>>>;

    async fn sadd(&self, key: &str, member: String) -> StoreResult<()>;
    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>>;

    async fn delete_pattern(&self, glob: &str) -> StoreResult<u64>;
    async fn clear_namespace(&self, prefix: &str) -> StoreResult<u64>;

    async fn health_check(&self) -> HealthStatus;
}
