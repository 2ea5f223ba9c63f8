//! The [`Storage`] trait: everything the orchestrator needs persisted.
//!
//! Implementations route through whatever fallback fabric the host
//! application uses (relational store primary, vector-store degraded
//! mode, and so on) — this crate only needs atomic claim/persist/progress
//! semantics, not an opinion about which store backs them.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::ids::RequestId;
use crate::request::{AnyRecord, Pending, ProcessingRequest, Record, RequestStatus};

/// Atomic delta applied to a `ProcessingRequest`'s progress counters.
///
/// Progress counters advance in happens-before order with a single writer
/// per request; implementations must apply each delta atomically (e.g. a
/// single `UPDATE ... SET processed = processed + $1` statement) rather
/// than read-modify-write in the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressDelta {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Create a new processing request and seed it with pending records.
    async fn create_request(&self, items: Vec<(String, serde_json::Value)>, ttl_after_terminal: Duration) -> Result<ProcessingRequest>;

    async fn get_request(&self, id: RequestId) -> Result<ProcessingRequest>;

    async fn list_records(&self, id: RequestId, skip: u64, limit: u64) -> Result<Vec<AnyRecord>>;

    /// Atomically claim up to `limit` pending records for this request.
    async fn claim_pending(&self, id: RequestId, limit: usize) -> Result<Vec<Record<Pending>>>;

    /// Persist a record's current state (any typestate, via [`AnyRecord`]).
    async fn persist_record(&self, record: AnyRecord) -> Result<()>;

    async fn apply_progress(&self, id: RequestId, delta: ProgressDelta) -> Result<()>;

    async fn set_status(&self, id: RequestId, status: RequestStatus, error: Option<String>) -> Result<()>;

    /// Cooperative cancellation flag, checked between items and at stage boundaries.
    async fn is_cancelled(&self, id: RequestId) -> Result<bool>;

    async fn request_cancel(&self, id: RequestId) -> Result<()>;

    /// Re-queue an explicitly retried failed record. No-op if the retry budget is exhausted.
    async fn retry_failed(&self, id: RequestId, retry_budget: u32) -> Result<u64>;

    /// Delete terminal records (and their parent request, once all records are terminal
    /// and past `ttl_after_terminal`) older than `older_than`. Returns the count reaped.
    async fn cleanup_terminal(&self, older_than: Duration) -> Result<u64>;
}
