//! Vector store adapter backed by Qdrant.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, Filter, PointId, PointStruct, Range as QdrantRange, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::{BatchUpsertReport, HealthStatus, StoreError, StoreResult, VectorFilter, VectorHit, VectorPoint, VectorStore};

const STORE: &str = "vector";

pub struct QdrantVectorStore {
    client: Qdrant,
    call_timeout: Duration,
}

impl QdrantVectorStore {
    pub fn connect(url: &str, api_key: Option<&str>, call_timeout: Duration) -> anyhow::Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder.build()?;
        Ok(Self { client, call_timeout })
    }

    fn to_qdrant_filter(filter: &VectorFilter) -> Filter {
        let mut must = Vec::new();
        for (key, value) in &filter.equals {
            must.push(json_condition(key, value));
        }
        for (key, values) in &filter.in_set {
            must.push(Condition::matches(key.clone(), values.iter().filter_map(value_to_string).collect::<Vec<_>>()));
        }
        for (key, range) in &filter.range {
            must.push(Condition::range(
                key.clone(),
                QdrantRange {
                    gte: range.gte.as_ref().and_then(|v| v.as_f64()),
                    lte: range.lte.as_ref().and_then(|v| v.as_f64()),
                    ..Default::default()
                },
            ));
        }
        Filter {
            must,
            ..Default::default()
        }
    }

    async fn with_timeout<T>(&self, fut: impl std::future::Future<Output = Result<T, qdrant_client::QdrantError>>) -> StoreResult<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(classify(err)),
            Err(_) => Err(StoreError::Timeout {
                store: STORE,
                elapsed_ms: self.call_timeout.as_millis() as u64,
            }),
        }
    }
}

fn json_condition(key: &str, value: &serde_json::Value) -> Condition {
    match value {
        serde_json::Value::String(s) => Condition::matches(key.to_string(), s.clone()),
        serde_json::Value::Bool(b) => Condition::matches(key.to_string(), *b),
        serde_json::Value::Number(n) if n.is_i64() => Condition::matches(key.to_string(), n.as_i64().unwrap()),
        _ => Condition::matches(key.to_string(), value.to_string()),
    }
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn classify(err: qdrant_client::QdrantError) -> StoreError {
    let message = err.to_string();
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("connect") || lowered.contains("unavailable") || lowered.contains("transport") {
        StoreError::Connection { store: STORE, message }
    } else if lowered.contains("timeout") || lowered.contains("deadline") {
        StoreError::Timeout { store: STORE, elapsed_ms: 0 }
    } else {
        StoreError::Query { store: STORE, message }
    }
}

fn payload_to_qdrant(payload: &serde_json::Value) -> HashMap<String, QdrantValue> {
    match payload {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), QdrantValue::from(v.to_string())))
            .collect(),
        _ => HashMap::new(),
    }
}

fn qdrant_to_payload(payload: &HashMap<String, QdrantValue>) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for (k, v) in payload {
        let as_str = format!("{v:?}");
        out.insert(k.clone(), serde_json::Value::String(as_str));
    }
    serde_json::Value::Object(out)
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn search(&self, collection: &str, query_vector: &[f32], limit: usize, filter: Option<&VectorFilter>) -> StoreResult<Vec<VectorHit>> {
        let mut builder = SearchPointsBuilder::new(collection, query_vector.to_vec(), limit as u64).with_payload(true);
        if let Some(filter) = filter {
            builder = builder.filter(Self::to_qdrant_filter(filter));
        }
        let response = self.with_timeout(self.client.search_points(builder)).await?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point_id_to_uuid(point.id.as_ref()?)?;
                Some(VectorHit {
                    id,
                    score: point.score,
                    payload: qdrant_to_payload(&point.payload),
                })
            })
            .collect())
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> StoreResult<()> {
        let qdrant_points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| PointStruct::new(p.id.to_string(), p.vector, payload_to_qdrant(&p.payload)))
            .collect();
        self.with_timeout(self.client.upsert_points(UpsertPointsBuilder::new(collection, qdrant_points)))
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: uuid::Uuid) -> StoreResult<()> {
        let points = qdrant_client::qdrant::PointsIdsList {
            ids: vec![PointId::from(id.to_string())],
        };
        self.with_timeout(
            self.client
                .delete_points(qdrant_client::qdrant::DeletePointsBuilder::new(collection).points(points)),
        )
        .await?;
        Ok(())
    }

    async fn batch_upsert(&self, collection: &str, points: Vec<VectorPoint>, batch_size: usize) -> StoreResult<BatchUpsertReport> {
        let mut report = BatchUpsertReport {
            upserted: 0,
            failed_indices: Vec::new(),
        };
        for (chunk_index, chunk) in points.chunks(batch_size.max(1)).enumerate() {
            let chunk_points: Vec<PointStruct> = chunk
                .iter()
                .map(|p| PointStruct::new(p.id.to_string(), p.vector.clone(), payload_to_qdrant(&p.payload)))
                .collect();
            let chunk_len = chunk_points.len();
            match self
                .with_timeout(self.client.upsert_points(UpsertPointsBuilder::new(collection, chunk_points)))
                .await
            {
                Ok(_) => report.upserted += chunk_len,
                Err(err) if err.is_fallthrough_eligible() => {
                    // Per-chunk retry once before recording the failure; the fallback
                    // fabric handles any further escalation.
                    let retry_points: Vec<PointStruct> = chunk
                        .iter()
                        .map(|p| PointStruct::new(p.id.to_string(), p.vector.clone(), payload_to_qdrant(&p.payload)))
                        .collect();
                    match self
                        .with_timeout(self.client.upsert_points(UpsertPointsBuilder::new(collection, retry_points)))
                        .await
                    {
                        Ok(_) => report.upserted += chunk_len,
                        Err(_) => {
                            let base = chunk_index * batch_size;
                            report.failed_indices.extend(base..base + chunk_len);
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    async fn get(&self, collection: &str, id: uuid::Uuid) -> StoreResult<Option<VectorPoint>> {
        let points = self
            .with_timeout(
                self.client
                    .get_points(qdrant_client::qdrant::GetPointsBuilder::new(collection, vec![PointId::from(id.to_string())]).with_payload(true).with_vectors(true)),
            )
            .await?;

        Ok(points.result.into_iter().next().map(|p| VectorPoint {
            id,
            vector: p
                .vectors
                .and_then(|v| v.vector)
                .and_then(|v| match v {
                    qdrant_client::qdrant::vector_output::Vector::Dense(dense) => Some(dense.data),
                    _ => None,
                })
                .unwrap_or_default(),
            payload: qdrant_to_payload(&p.payload),
        }))
    }

    async fn health_check(&self) -> HealthStatus {
        let start = Instant::now();
        match tokio::time::timeout(self.call_timeout, self.client.health_check()).await {
            Ok(Ok(_)) => HealthStatus::healthy(start.elapsed()),
            Ok(Err(err)) => HealthStatus::unavailable(err.to_string()),
            Err(_) => HealthStatus::unavailable("health check timed out"),
        }
    }
}

fn point_id_to_uuid(id: &PointId) -> Option<uuid::Uuid> {
    match &id.point_id_options {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s)) => uuid::Uuid::parse_str(s).ok(),
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => {
            let bytes = n.to_le_bytes();
            let mut buf = [0u8; 16];
            buf[..8].copy_from_slice(&bytes);
            Some(uuid::Uuid::from_bytes(buf))
        }
        None => None,
    }
}
