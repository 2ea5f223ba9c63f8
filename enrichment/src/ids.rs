use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a [`crate::request::ProcessingRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        RequestId(uuid)
    }
}

impl std::ops::Deref for RequestId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The pipeline stage a record is currently passing through.
///
/// Order is significant and matches the strict per-item stage sequence:
/// parse -> normalize -> assign SKU -> persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    Parsing,
    Normalizing,
    AssigningSku,
    Persisting,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Queued => "queued",
            Stage::Parsing => "parsing",
            Stage::Normalizing => "normalizing",
            Stage::AssigningSku => "assigning_sku",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
        };
        write!(f, "{s}")
    }
}
