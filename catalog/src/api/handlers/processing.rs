//! Processing surface: submit, status, results, stats, retry, cleanup (§6).

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::models::pagination::{Page, SkipLimitQuery};
use crate::api::models::processing::{ProcessingRequestResponse, ProcessingStats, SubmitBatchRequest};
use crate::app_state::AppState;
use crate::errors::{Error, Result};
use enrichment::{AnyRecord, RequestId, Storage};

use super::{created, ok};

const MAX_BATCH_ITEMS: usize = 1000;

pub async fn submit(State(state): State<AppState>, Json(request): Json<SubmitBatchRequest>) -> Result<Response> {
    if request.items.is_empty() {
        return Err(Error::validation("items", "batch must contain at least one item"));
    }
    if request.items.len() > MAX_BATCH_ITEMS {
        return Err(Error::validation("items", format!("batch accepts at most {MAX_BATCH_ITEMS} items, got {}", request.items.len())));
    }

    let items: Vec<(String, serde_json::Value)> = request.items.into_iter().enumerate().map(|(index, value)| (index.to_string(), value)).collect();

    let ttl = std::time::Duration::from_secs(state.config.batch.cleanup_ttl_days * 86_400);
    let processing_request = state.storage.create_request(items, ttl).await.map_err(|err| Error::internal(anyhow::anyhow!(err)))?;

    state
        .scheduler_tx
        .send(processing_request.request_id)
        .await
        .map_err(|err| Error::internal(anyhow::anyhow!(err)))?;

    Ok(created(ProcessingRequestResponse::from(processing_request)))
}

pub async fn status(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let request = state.storage.get_request(RequestId::from(id)).await.map_err(|err| to_catalog_error(id, err))?;
    Ok(ok(ProcessingRequestResponse::from(request)))
}

pub async fn results(State(state): State<AppState>, Path(id): Path<Uuid>, Query(query): Query<SkipLimitQuery>) -> Result<Response> {
    query.validate().map_err(|message| Error::validation("limit", message))?;
    let records = state
        .storage
        .list_records(RequestId::from(id), query.skip, query.limit)
        .await
        .map_err(|err| to_catalog_error(id, err))?;

    let total = records.len() as u64;
    let page = Page {
        items: records,
        total,
        skip: query.skip,
        limit: query.limit,
    };
    Ok(ok(page))
}

pub async fn stats(State(state): State<AppState>) -> Result<Response> {
    let degraded = state.fabric.is_processing_degraded();
    let row = state.storage.aggregate_stats().await.map_err(|err| Error::internal(anyhow::anyhow!(err)))?;
    let stats = ProcessingStats {
        total_requests: row.total_requests,
        completed: row.completed,
        failed: row.failed,
        cancelled: row.cancelled,
        in_flight: row.in_flight,
    };
    Ok(ok(serde_json::json!({ "stats": stats, "degraded_mode": degraded })))
}

pub async fn retry(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let retried = state
        .storage
        .retry_failed(RequestId::from(id), state.config.batch.retry_budget)
        .await
        .map_err(|err| to_catalog_error(id, err))?;

    if retried > 0 {
        state
            .scheduler_tx
            .send(RequestId::from(id))
            .await
            .map_err(|err| Error::internal(anyhow::anyhow!(err)))?;
    }

    Ok(ok(serde_json::json!({ "request_id": id, "retried": retried })))
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    state.storage.request_cancel(RequestId::from(id)).await.map_err(|err| to_catalog_error(id, err))?;
    Ok(ok(serde_json::json!({ "request_id": id, "cancel_requested": true })))
}

#[derive(Serialize)]
struct CleanupSummary {
    reaped: u64,
}

pub async fn cleanup(State(state): State<AppState>) -> Result<Response> {
    let ttl = std::time::Duration::from_secs(state.config.batch.cleanup_ttl_days * 86_400);
    let reaped = state.storage.cleanup_terminal(ttl).await.map_err(|err| Error::internal(anyhow::anyhow!(err)))?;
    Ok(ok(CleanupSummary { reaped }))
}

fn to_catalog_error(id: Uuid, err: enrichment::EnrichmentError) -> Error {
    match err {
        enrichment::EnrichmentError::RequestNotFound(_) => Error::not_found("processing_request", id.to_string()),
        other => Error::internal(anyhow::anyhow!(other)),
    }
}
