//! [`ProcessingRequest`] and [`Record`] — the batch and per-item state machines.
//!
//! `Record<S>` uses the typestate pattern so illegal transitions (e.g.
//! completing a record that never started) are rejected at compile time.
//! Heterogeneous collections (a page of records in mixed states, as read
//! back from storage) are held as [`AnyRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ids::{RequestId, Stage};

/// Sealed marker trait for record states.
pub trait RecordState: Clone + std::fmt::Debug + Send + Sync + 'static {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pending;
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InProgress {
    pub started_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Succeeded {
    pub completed_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failed {
    pub failed_at: DateTime<Utc>,
    pub permanent: bool,
}

impl RecordState for Pending {
    const NAME: &'static str = "pending";
}
impl RecordState for InProgress {
    const NAME: &'static str = "in_progress";
}
impl RecordState for Succeeded {
    const NAME: &'static str = "succeeded";
}
impl RecordState for Failed {
    const NAME: &'static str = "failed";
}

/// A single catalog row moving through the enrichment pipeline.
///
/// `material_key` is the stable id of the input item (supplier row key);
/// it never changes across retries, so callers can correlate a
/// `ProcessingRecord` back to the originating `RawProduct` regardless of
/// how many times it was attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<S: RecordState> {
    pub request_id: RequestId,
    pub material_key: String,
    pub stage: Stage,
    pub input_snapshot: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
    pub state: S,
}

impl Record<Pending> {
    pub fn new(request_id: RequestId, material_key: String, input_snapshot: serde_json::Value) -> Self {
        Self {
            request_id,
            material_key,
            stage: Stage::Queued,
            input_snapshot,
            output: None,
            error: None,
            attempts: 0,
            updated_at: Utc::now(),
            state: Pending,
        }
    }
}

/// A record in any of its possible states, as read back from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnyRecord {
    Pending(Record<Pending>),
    InProgress(Record<InProgress>),
    Succeeded(Record<Succeeded>),
    Failed(Record<Failed>),
}

impl AnyRecord {
    pub fn material_key(&self) -> &str {
        match self {
            AnyRecord::Pending(r) => &r.material_key,
            AnyRecord::InProgress(r) => &r.material_key,
            AnyRecord::Succeeded(r) => &r.material_key,
            AnyRecord::Failed(r) => &r.material_key,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnyRecord::Succeeded(_) | AnyRecord::Failed(_))
    }

    pub fn attempts(&self) -> u32 {
        match self {
            AnyRecord::Pending(r) => r.attempts,
            AnyRecord::InProgress(r) => r.attempts,
            AnyRecord::Succeeded(r) => r.attempts,
            AnyRecord::Failed(r) => r.attempts,
        }
    }
}

impl From<Record<Pending>> for AnyRecord {
    fn from(r: Record<Pending>) -> Self {
        AnyRecord::Pending(r)
    }
}
impl From<Record<InProgress>> for AnyRecord {
    fn from(r: Record<InProgress>) -> Self {
        AnyRecord::InProgress(r)
    }
}
impl From<Record<Succeeded>> for AnyRecord {
    fn from(r: Record<Succeeded>) -> Self {
        AnyRecord::Succeeded(r)
    }
}
impl From<Record<Failed>> for AnyRecord {
    fn from(r: Record<Failed>) -> Self {
        AnyRecord::Failed(r)
    }
}

/// Top-level status of a batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed | RequestStatus::Cancelled)
    }
}

/// One submitted batch of items awaiting enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRequest {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed_count: u64,
    pub current_stage: Stage,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub ttl_after_terminal: Duration,
}

impl ProcessingRequest {
    pub fn new(total: u64, ttl_after_terminal: Duration) -> Self {
        Self {
            request_id: RequestId::new(),
            status: RequestStatus::Queued,
            total,
            processed: 0,
            succeeded: 0,
            failed_count: 0,
            current_stage: Stage::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            ttl_after_terminal,
        }
    }

    /// `total == succeeded + failed_count + pending + in_progress` invariant,
    /// restated as: anything not yet terminal is still outstanding.
    pub fn outstanding(&self) -> u64 {
        self.total.saturating_sub(self.succeeded + self.failed_count)
    }

    pub fn is_finished(&self) -> bool {
        self.succeeded + self.failed_count >= self.total
    }
}
