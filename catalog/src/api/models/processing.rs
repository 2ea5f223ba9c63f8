//! Request/response DTOs for the Processing surface (§6).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use enrichment::{ProcessingRequest, RequestStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitBatchRequest {
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingRequestResponse {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed_count: u64,
    pub current_stage: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error: Option<String>,
}

impl From<ProcessingRequest> for ProcessingRequestResponse {
    fn from(request: ProcessingRequest) -> Self {
        Self {
            request_id: *request.request_id,
            status: request.status,
            total: request.total,
            processed: request.processed,
            succeeded: request.succeeded,
            failed_count: request.failed_count,
            current_stage: request.current_stage.to_string(),
            created_at: request.created_at,
            started_at: request.started_at,
            completed_at: request.completed_at,
            error: request.error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingStats {
    pub total_requests: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub in_flight: u64,
}
