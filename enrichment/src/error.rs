use thiserror::Error as ThisError;

/// Errors surfaced by the orchestration layer itself (not by the items it processes).
#[derive(ThisError, Debug)]
pub enum EnrichmentError {
    #[error("processing request {0} not found")]
    RequestNotFound(crate::ids::RequestId),

    #[error("storage operation failed: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("request {0} is already in a terminal state")]
    AlreadyTerminal(crate::ids::RequestId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EnrichmentError>;
