//! [`ItemProcessor`]: the business logic the orchestrator drives but does not own.

use async_trait::async_trait;

use crate::ids::Stage;

/// Whether a processing failure should be retried or is permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessErrorKind {
    /// Transient: embedding call failed, store timed out, etc. Eligible for retry.
    Transient,
    /// Permanent: validation failure, row structurally unusable. Never retried.
    Permanent,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProcessError {
    pub kind: ProcessErrorKind,
    pub message: String,
}

impl ProcessError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ProcessErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ProcessErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == ProcessErrorKind::Permanent
    }
}

/// Lets a processor report its current sub-stage as it moves through
/// parse -> normalize -> assign-sku -> persist, so the persisted record
/// reflects progress even while the item is still in flight.
pub trait StageReporter: Send + Sync {
    fn report_stage(&self, stage: Stage);
}

/// Processes one item end to end. Implementations own the actual
/// parse/normalize/assign-sku/persist sequence; the orchestrator only
/// calls this once per (attempt of a) record.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    async fn process(
        &self,
        material_key: &str,
        input: serde_json::Value,
        reporter: &(dyn StageReporter + Send + Sync),
    ) -> Result<serde_json::Value, ProcessError>;
}
