//! [`enrichment::Storage`] implementation backed by the relational
//! store, with transparent degradation to the fallback fabric's
//! vector-backed collections (§4.2) when the relational store reports a
//! fall-through-eligible error. Degradation is not limited to the write
//! path: every operation that touches `processing_requests`/
//! `processing_records` falls back to a best-effort vector-backed
//! equivalent, so polling/status/cancel/retry keep working (with reduced
//! precision) while the relational store is unavailable rather than
//! hard-failing the moment it is.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;
use std::time::Duration;

use enrichment::{AnyRecord, Failed, InProgress, Pending, ProcessingRequest, ProgressDelta, Record, RequestId, RequestStatus, Stage, Storage, Succeeded};

use crate::fabric::routing::DataFabric;
use crate::store::{StoreError, VectorFilter};

/// Vector collection holding a best-effort snapshot of each
/// `processing_requests` row, keyed by `request_id`. Distinct from
/// `processing_records`, which holds per-item records.
const PROCESSING_REQUESTS_COLLECTION: &str = "processing_requests_degraded";

pub struct PostgresProcessingStore {
    fabric: Arc<DataFabric>,
}

impl PostgresProcessingStore {
    pub fn new(fabric: Arc<DataFabric>) -> Self {
        Self { fabric }
    }

    fn into_enrichment_err(err: StoreError) -> enrichment::EnrichmentError {
        enrichment::EnrichmentError::Storage(anyhow::anyhow!(err))
    }

    /// Current degraded snapshot for `id`, plus its cancel flag, or a
    /// zero-valued baseline if nothing has been recorded yet (first time
    /// this request falls through to degraded mode).
    async fn degraded_snapshot(&self, id: RequestId) -> (ProcessingRequest, bool) {
        match self.fabric.read_degraded(PROCESSING_REQUESTS_COLLECTION, *id).await {
            Ok(Some(payload)) => (request_from_degraded_payload(id, &payload), degraded_cancel_requested(&payload)),
            _ => (
                ProcessingRequest {
                    request_id: id,
                    ..ProcessingRequest::new(0, Duration::from_secs(0))
                },
                false,
            ),
        }
    }

    async fn write_degraded_snapshot(&self, snapshot: &ProcessingRequest, cancel_requested: bool) -> enrichment::Result<()> {
        self.fabric
            .write_degraded(PROCESSING_REQUESTS_COLLECTION, *snapshot.request_id, degraded_request_payload(snapshot, cancel_requested))
            .await
            .map_err(Self::into_enrichment_err)
    }

    /// Aggregate counts for the statistics endpoint. Not part of the
    /// generic `Storage` contract (it has no notion of aggregation); reads
    /// straight off the relational store since there is no cheap,
    /// consistent degraded-mode equivalent.
    pub async fn aggregate_stats(&self) -> enrichment::Result<ProcessingStatsRow> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM processing_requests GROUP BY status")
            .fetch_all(self.fabric.relational.pool())
            .await
            .map_err(|e| enrichment::EnrichmentError::Storage(e.into()))?;

        let mut stats = ProcessingStatsRow::default();
        for row in rows {
            let status: String = row.get("status");
            let count = row.get::<i64, _>("count") as u64;
            stats.total_requests += count;
            match status.as_str() {
                "completed" => stats.completed = count,
                "failed" => stats.failed = count,
                "cancelled" => stats.cancelled = count,
                "queued" | "processing" => stats.in_flight += count,
                _ => {}
            }
        }
        Ok(stats)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessingStatsRow {
    pub total_requests: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub in_flight: u64,
}

fn stage_from_str(s: &str) -> Stage {
    match s {
        "parsing" => Stage::Parsing,
        "normalizing" => Stage::Normalizing,
        "assigning_sku" => Stage::AssigningSku,
        "persisting" => Stage::Persisting,
        "done" => Stage::Done,
        _ => Stage::Queued,
    }
}

fn status_from_str(s: &str) -> RequestStatus {
    match s {
        "processing" => RequestStatus::Processing,
        "completed" => RequestStatus::Completed,
        "failed" => RequestStatus::Failed,
        "cancelled" => RequestStatus::Cancelled,
        _ => RequestStatus::Queued,
    }
}

fn record_status_str(record: &AnyRecord) -> &'static str {
    match record {
        AnyRecord::Pending(_) => "pending",
        AnyRecord::InProgress(_) => "in_progress",
        AnyRecord::Succeeded(_) => "succeeded",
        AnyRecord::Failed(_) => "failed",
    }
}

fn status_to_str(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Queued => "queued",
        RequestStatus::Processing => "processing",
        RequestStatus::Completed => "completed",
        RequestStatus::Failed => "failed",
        RequestStatus::Cancelled => "cancelled",
    }
}

/// Builds the degraded-mode snapshot payload for a `ProcessingRequest`.
/// `cancel_requested` rides alongside rather than as a struct field since
/// `ProcessingRequest` itself has no such field (it is a relational-only
/// column mirrored here for the degraded read path).
fn degraded_request_payload(req: &ProcessingRequest, cancel_requested: bool) -> serde_json::Value {
    serde_json::json!({
        "request_id": *req.request_id,
        "status": req.status,
        "total": req.total,
        "processed": req.processed,
        "succeeded": req.succeeded,
        "failed_count": req.failed_count,
        "current_stage": req.current_stage,
        "created_at": req.created_at,
        "started_at": req.started_at,
        "completed_at": req.completed_at,
        "error": req.error,
        "ttl_after_terminal_secs": req.ttl_after_terminal.as_secs(),
        "cancel_requested": cancel_requested,
    })
}

fn request_from_degraded_payload(id: RequestId, payload: &serde_json::Value) -> ProcessingRequest {
    ProcessingRequest {
        request_id: id,
        status: payload.get("status").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or(RequestStatus::Queued),
        total: payload.get("total").and_then(|v| v.as_u64()).unwrap_or(0),
        processed: payload.get("processed").and_then(|v| v.as_u64()).unwrap_or(0),
        succeeded: payload.get("succeeded").and_then(|v| v.as_u64()).unwrap_or(0),
        failed_count: payload.get("failed_count").and_then(|v| v.as_u64()).unwrap_or(0),
        current_stage: payload.get("current_stage").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or(Stage::Queued),
        created_at: payload.get("created_at").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or_else(Utc::now),
        started_at: payload.get("started_at").and_then(|v| serde_json::from_value(v.clone()).ok()),
        completed_at: payload.get("completed_at").and_then(|v| serde_json::from_value(v.clone()).ok()),
        error: payload.get("error").and_then(|v| v.as_str()).map(str::to_string),
        ttl_after_terminal: Duration::from_secs(payload.get("ttl_after_terminal_secs").and_then(|v| v.as_u64()).unwrap_or(0)),
    }
}

fn degraded_cancel_requested(payload: &serde_json::Value) -> bool {
    payload.get("cancel_requested").and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Reconstructs a record from the degraded per-item payload written by
/// [`Storage::persist_record`]'s fallback path. That payload carries only
/// `status`/`stage`/`output`/`error`/`attempts` (no `input_snapshot` or
/// `updated_at`), so both are approximated here.
fn payload_to_any_record(request_id: RequestId, payload: &serde_json::Value) -> AnyRecord {
    let status = payload.get("status").and_then(|v| v.as_str()).unwrap_or("pending").to_string();
    let material_key = payload.get("material_key").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let stage = stage_from_str(payload.get("stage").and_then(|v| v.as_str()).unwrap_or("queued"));
    let output = payload.get("output").cloned().filter(|v| !v.is_null());
    let error = payload.get("error").and_then(|v| v.as_str()).map(str::to_string);
    let attempts = payload.get("attempts").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let updated_at = Utc::now();
    let input_snapshot = serde_json::Value::Null;

    match status.as_str() {
        "in_progress" => AnyRecord::InProgress(Record {
            request_id,
            material_key,
            stage,
            input_snapshot,
            output,
            error,
            attempts,
            updated_at,
            state: InProgress { started_at: updated_at },
        }),
        "succeeded" => AnyRecord::Succeeded(Record {
            request_id,
            material_key,
            stage,
            input_snapshot,
            output,
            error,
            attempts,
            updated_at,
            state: Succeeded { completed_at: updated_at },
        }),
        "failed" => AnyRecord::Failed(Record {
            request_id,
            material_key,
            stage,
            input_snapshot,
            output,
            error,
            attempts,
            updated_at,
            state: Failed {
                failed_at: updated_at,
                permanent: attempts >= 3,
            },
        }),
        _ => AnyRecord::Pending(Record {
            request_id,
            material_key,
            stage,
            input_snapshot,
            output,
            error,
            attempts,
            updated_at,
            state: Pending,
        }),
    }
}

#[async_trait]
impl Storage for PostgresProcessingStore {
    async fn create_request(&self, items: Vec<(String, serde_json::Value)>, ttl_after_terminal: Duration) -> enrichment::Result<ProcessingRequest> {
        let request = ProcessingRequest::new(items.len() as u64, ttl_after_terminal);

        sqlx::query(
            "INSERT INTO processing_requests (request_id, status, total, processed, succeeded, failed_count, current_stage, created_at, ttl_after_terminal_secs, cancel_requested) \
             VALUES ($1, 'queued', $2, 0, 0, 0, 'queued', $3, $4, false)",
        )
        .bind(*request.request_id)
        .bind(request.total as i64)
        .bind(request.created_at)
        .bind(ttl_after_terminal.as_secs() as i64)
        .execute(self.fabric.relational.pool())
        .await
        .map_err(|e| enrichment::EnrichmentError::Storage(e.into()))?;

        for (material_key, input) in items {
            sqlx::query(
                "INSERT INTO processing_records (request_id, material_key, status, stage, input_snapshot, attempts, updated_at) \
                 VALUES ($1, $2, 'pending', 'queued', $3, 0, $4)",
            )
            .bind(*request.request_id)
            .bind(&material_key)
            .bind(&input)
            .bind(Utc::now())
            .execute(self.fabric.relational.pool())
            .await
            .map_err(|e| enrichment::EnrichmentError::Storage(e.into()))?;
        }

        Ok(request)
    }

    async fn get_request(&self, id: RequestId) -> enrichment::Result<ProcessingRequest> {
        let result = sqlx::query(
            "SELECT status, total, processed, succeeded, failed_count, current_stage, created_at, started_at, completed_at, error, ttl_after_terminal_secs \
             FROM processing_requests WHERE request_id = $1",
        )
        .bind(*id)
        .fetch_optional(self.fabric.relational.pool())
        .await;

        match result {
            Ok(Some(row)) => Ok(ProcessingRequest {
                request_id: id,
                status: status_from_str(row.get("status")),
                total: row.get::<i64, _>("total") as u64,
                processed: row.get::<i64, _>("processed") as u64,
                succeeded: row.get::<i64, _>("succeeded") as u64,
                failed_count: row.get::<i64, _>("failed_count") as u64,
                current_stage: stage_from_str(row.get("current_stage")),
                created_at: row.get("created_at"),
                started_at: row.get("started_at"),
                completed_at: row.get("completed_at"),
                error: row.get("error"),
                ttl_after_terminal: Duration::from_secs(row.get::<i64, _>("ttl_after_terminal_secs") as u64),
            }),
            Ok(None) => Err(enrichment::EnrichmentError::RequestNotFound(id)),
            Err(e) => {
                let store_err = crate::db::classify_for_pool(e);
                if !store_err.is_fallthrough_eligible() {
                    return Err(Self::into_enrichment_err(store_err));
                }
                match self.fabric.read_degraded(PROCESSING_REQUESTS_COLLECTION, *id).await {
                    Ok(Some(payload)) => Ok(request_from_degraded_payload(id, &payload)),
                    Ok(None) => Err(enrichment::EnrichmentError::RequestNotFound(id)),
                    Err(_) => Err(Self::into_enrichment_err(store_err)),
                }
            }
        }
    }

    async fn list_records(&self, id: RequestId, skip: u64, limit: u64) -> enrichment::Result<Vec<AnyRecord>> {
        let result = sqlx::query(
            "SELECT material_key, status, stage, input_snapshot, output, error, attempts, updated_at \
             FROM processing_records WHERE request_id = $1 ORDER BY material_key OFFSET $2 LIMIT $3",
        )
        .bind(*id)
        .bind(skip as i64)
        .bind(limit as i64)
        .fetch_all(self.fabric.relational.pool())
        .await;

        match result {
            Ok(rows) => Ok(rows.into_iter().map(|row| row_to_any_record(id, row)).collect()),
            Err(e) => {
                let store_err = crate::db::classify_for_pool(e);
                if !store_err.is_fallthrough_eligible() {
                    return Err(Self::into_enrichment_err(store_err));
                }
                let mut filter = VectorFilter::default();
                filter.equals.insert("request_id".to_string(), serde_json::Value::String(id.to_string()));
                let mut payloads = self
                    .fabric
                    .scan_progress_degraded(filter, (skip + limit).max(limit) as usize)
                    .await
                    .map_err(Self::into_enrichment_err)?;
                payloads.sort_by(|a, b| {
                    let a_key = a.get("material_key").and_then(|v| v.as_str()).unwrap_or_default();
                    let b_key = b.get("material_key").and_then(|v| v.as_str()).unwrap_or_default();
                    a_key.cmp(b_key)
                });
                let page = payloads.into_iter().skip(skip as usize).take(limit as usize).map(|payload| payload_to_any_record(id, &payload)).collect();
                Ok(page)
            }
        }
    }

    async fn claim_pending(&self, id: RequestId, limit: usize) -> enrichment::Result<Vec<Record<Pending>>> {
        let result = sqlx::query(
            "UPDATE processing_records SET status = 'in_progress', updated_at = $3 \
             WHERE (request_id, material_key) IN ( \
                SELECT request_id, material_key FROM processing_records \
                WHERE request_id = $1 AND status = 'pending' \
                ORDER BY material_key LIMIT $2 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING material_key, stage, input_snapshot, attempts",
        )
        .bind(*id)
        .bind(limit as i64)
        .bind(Utc::now())
        .fetch_all(self.fabric.relational.pool())
        .await;

        match result {
            Ok(rows) => Ok(rows
                .into_iter()
                .map(|row| Record {
                    request_id: id,
                    material_key: row.get("material_key"),
                    stage: stage_from_str(row.get("stage")),
                    input_snapshot: row.get("input_snapshot"),
                    output: None,
                    error: None,
                    attempts: row.get::<i32, _>("attempts") as u32,
                    updated_at: Utc::now(),
                    state: Pending,
                })
                .collect()),
            Err(e) => {
                let store_err = crate::db::classify_for_pool(e);
                if store_err.is_fallthrough_eligible() {
                    // Claiming pending work is a compare-and-swap the vector
                    // store cannot provide; degraded mode yields no new work
                    // until the relational store recovers.
                    Ok(Vec::new())
                } else {
                    Err(Self::into_enrichment_err(store_err))
                }
            }
        }
    }

    async fn persist_record(&self, record: AnyRecord) -> enrichment::Result<()> {
        let status = record_status_str(&record);
        let (material_key, request_id, stage, output, error, attempts) = match &record {
            AnyRecord::Pending(r) => (r.material_key.clone(), r.request_id, r.stage, r.output.clone(), r.error.clone(), r.attempts),
            AnyRecord::InProgress(r) => (r.material_key.clone(), r.request_id, r.stage, r.output.clone(), r.error.clone(), r.attempts),
            AnyRecord::Succeeded(r) => (r.material_key.clone(), r.request_id, r.stage, r.output.clone(), r.error.clone(), r.attempts),
            AnyRecord::Failed(r) => (r.material_key.clone(), r.request_id, r.stage, r.output.clone(), r.error.clone(), r.attempts),
        };

        let result = sqlx::query(
            "UPDATE processing_records SET status = $1, stage = $2, output = $3, error = $4, attempts = $5, updated_at = $6 \
             WHERE request_id = $7 AND material_key = $8",
        )
        .bind(status)
        .bind(stage.to_string())
        .bind(&output)
        .bind(&error)
        .bind(attempts as i32)
        .bind(Utc::now())
        .bind(*request_id)
        .bind(&material_key)
        .execute(self.fabric.relational.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let store_err = crate::db::classify_for_pool(e);
                if store_err.is_fallthrough_eligible() {
                    let payload = serde_json::json!({
                        "request_id": *request_id,
                        "material_key": material_key,
                        "status": status,
                        "stage": stage.to_string(),
                        "output": output,
                        "error": error,
                        "attempts": attempts,
                    });
                    self.fabric
                        .write_progress_degraded(uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, material_key.as_bytes()), payload)
                        .await
                        .map_err(Self::into_enrichment_err)?;
                    Ok(())
                } else {
                    Err(Self::into_enrichment_err(store_err))
                }
            }
        }
    }

    async fn apply_progress(&self, id: RequestId, delta: ProgressDelta) -> enrichment::Result<()> {
        let result = sqlx::query("UPDATE processing_requests SET processed = processed + $2, succeeded = succeeded + $3, failed_count = failed_count + $4 WHERE request_id = $1")
            .bind(*id)
            .bind(delta.processed as i64)
            .bind(delta.succeeded as i64)
            .bind(delta.failed as i64)
            .execute(self.fabric.relational.pool())
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let store_err = crate::db::classify_for_pool(e);
                if !store_err.is_fallthrough_eligible() {
                    return Err(Self::into_enrichment_err(store_err));
                }
                let (mut snapshot, cancel_requested) = self.degraded_snapshot(id).await;
                snapshot.processed += delta.processed;
                snapshot.succeeded += delta.succeeded;
                snapshot.failed_count += delta.failed;
                self.write_degraded_snapshot(&snapshot, cancel_requested).await
            }
        }
    }

    async fn set_status(&self, id: RequestId, status: RequestStatus, error: Option<String>) -> enrichment::Result<()> {
        let status_str = status_to_str(status);
        let now = Utc::now();
        let started_at = matches!(status, RequestStatus::Processing).then_some(now);
        let completed_at = status.is_terminal().then_some(now);

        let result = sqlx::query(
            "UPDATE processing_requests SET status = $2, error = COALESCE($3, error), \
             started_at = COALESCE(started_at, $4), completed_at = COALESCE($5, completed_at) WHERE request_id = $1",
        )
        .bind(*id)
        .bind(&status_str)
        .bind(&error)
        .bind(started_at)
        .bind(completed_at)
        .execute(self.fabric.relational.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let store_err = crate::db::classify_for_pool(e);
                if !store_err.is_fallthrough_eligible() {
                    return Err(Self::into_enrichment_err(store_err));
                }
                let (mut snapshot, cancel_requested) = self.degraded_snapshot(id).await;
                snapshot.status = status;
                if error.is_some() {
                    snapshot.error = error;
                }
                if snapshot.started_at.is_none() {
                    snapshot.started_at = started_at;
                }
                if completed_at.is_some() {
                    snapshot.completed_at = completed_at;
                }
                self.write_degraded_snapshot(&snapshot, cancel_requested).await
            }
        }
    }

    async fn is_cancelled(&self, id: RequestId) -> enrichment::Result<bool> {
        let result = sqlx::query("SELECT cancel_requested FROM processing_requests WHERE request_id = $1")
            .bind(*id)
            .fetch_optional(self.fabric.relational.pool())
            .await;

        match result {
            Ok(Some(row)) => Ok(row.get("cancel_requested")),
            Ok(None) => Err(enrichment::EnrichmentError::RequestNotFound(id)),
            Err(e) => {
                let store_err = crate::db::classify_for_pool(e);
                if !store_err.is_fallthrough_eligible() {
                    return Err(Self::into_enrichment_err(store_err));
                }
                match self.fabric.read_degraded(PROCESSING_REQUESTS_COLLECTION, *id).await {
                    Ok(Some(payload)) => Ok(degraded_cancel_requested(&payload)),
                    Ok(None) => Ok(false),
                    Err(_) => Err(Self::into_enrichment_err(store_err)),
                }
            }
        }
    }

    async fn request_cancel(&self, id: RequestId) -> enrichment::Result<()> {
        let result = sqlx::query("UPDATE processing_requests SET cancel_requested = true WHERE request_id = $1")
            .bind(*id)
            .execute(self.fabric.relational.pool())
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let store_err = crate::db::classify_for_pool(e);
                if !store_err.is_fallthrough_eligible() {
                    return Err(Self::into_enrichment_err(store_err));
                }
                let (snapshot, _) = self.degraded_snapshot(id).await;
                self.write_degraded_snapshot(&snapshot, true).await
            }
        }
    }

    async fn retry_failed(&self, id: RequestId, retry_budget: u32) -> enrichment::Result<u64> {
        let result = sqlx::query(
            "UPDATE processing_records SET status = 'pending', updated_at = $3 \
             WHERE request_id = $1 AND status = 'failed' AND attempts < $2",
        )
        .bind(*id)
        .bind(retry_budget as i32)
        .bind(Utc::now())
        .execute(self.fabric.relational.pool())
        .await;

        match result {
            Ok(result) => Ok(result.rows_affected()),
            Err(e) => {
                let store_err = crate::db::classify_for_pool(e);
                if !store_err.is_fallthrough_eligible() {
                    return Err(Self::into_enrichment_err(store_err));
                }

                let mut filter = VectorFilter::default();
                filter.equals.insert("request_id".to_string(), serde_json::Value::String(id.to_string()));
                filter.equals.insert("status".to_string(), serde_json::Value::String("failed".to_string()));
                let stale = self.fabric.scan_progress_degraded(filter, 1000).await.map_err(Self::into_enrichment_err)?;

                let mut retried = 0u64;
                for mut payload in stale {
                    let attempts = payload.get("attempts").and_then(|v| v.as_u64()).unwrap_or(0);
                    if attempts >= retry_budget as u64 {
                        continue;
                    }
                    if let Some(material_key) = payload.get("material_key").and_then(|v| v.as_str()).map(str::to_string) {
                        payload["status"] = serde_json::Value::String("pending".to_string());
                        let point_id = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, material_key.as_bytes());
                        self.fabric.write_progress_degraded(point_id, payload).await.map_err(Self::into_enrichment_err)?;
                        retried += 1;
                    }
                }
                Ok(retried)
            }
        }
    }

    async fn cleanup_terminal(&self, older_than: Duration) -> enrichment::Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::days(30));

        let result = sqlx::query(
            "DELETE FROM processing_requests WHERE status IN ('completed', 'failed', 'cancelled') AND completed_at < $1",
        )
        .bind(cutoff)
        .execute(self.fabric.relational.pool())
        .await
        .map_err(|e| enrichment::EnrichmentError::Storage(e.into()))?;

        let degraded_filter = VectorFilter::default();
        if let Ok(stale) = self.fabric.scan_progress_degraded(degraded_filter, 1000).await {
            for record in stale {
                if let Some(id) = record.get("material_key").and_then(|v| v.as_str()) {
                    let point_id = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, id.as_bytes());
                    let _ = self.fabric.vector.delete("processing_records", point_id).await;
                }
            }
        }

        Ok(result.rows_affected())
    }
}

fn row_to_any_record(request_id: RequestId, row: sqlx::postgres::PgRow) -> AnyRecord {
    let status: String = row.get("status");
    let material_key: String = row.get("material_key");
    let stage = stage_from_str(row.get("stage"));
    let input_snapshot: serde_json::Value = row.get("input_snapshot");
    let output: Option<serde_json::Value> = row.get("output");
    let error: Option<String> = row.get("error");
    let attempts = row.get::<i32, _>("attempts") as u32;
    let updated_at = row.get("updated_at");

    match status.as_str() {
        "in_progress" => AnyRecord::InProgress(Record {
            request_id,
            material_key,
            stage,
            input_snapshot,
            output,
            error,
            attempts,
            updated_at,
            state: InProgress { started_at: updated_at },
        }),
        "succeeded" => AnyRecord::Succeeded(Record {
            request_id,
            material_key,
            stage,
            input_snapshot,
            output,
            error,
            attempts,
            updated_at,
            state: Succeeded { completed_at: updated_at },
        }),
        "failed" => AnyRecord::Failed(Record {
            request_id,
            material_key,
            stage,
            input_snapshot,
            output,
            error,
            attempts,
            updated_at,
            state: Failed {
                failed_at: updated_at,
                permanent: attempts >= 3,
            },
        }),
        _ => AnyRecord::Pending(Record {
            request_id,
            material_key,
            stage,
            input_snapshot,
            output,
            error,
            attempts,
            updated_at,
            state: Pending,
        }),
    }
}
