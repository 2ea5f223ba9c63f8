//! Storage-agnostic batch enrichment orchestration.
//!
//! This crate knows nothing about materials, colors, units, SKUs or
//! embeddings. It provides the request/record state machine, retry with
//! backoff, bounded concurrency and cooperative cancellation that a batch
//! enrichment pipeline needs, and leaves the actual per-item work (and
//! where records are persisted) to implementations of [`Storage`] and
//! [`ItemProcessor`].
//!
//! The split mirrors a daemon that claims queued work and drives it
//! through a typestate-checked lifecycle without knowing what the work
//! actually does — only here the unit of work is "enrich one catalog
//! row" instead of "send one HTTP request".

pub mod cleanup;
pub mod error;
pub mod ids;
pub mod orchestrator;
pub mod processor;
pub mod request;
pub mod retry;
pub mod storage;
pub mod transitions;

pub use error::{EnrichmentError, Result};
pub use ids::{RequestId, Stage};
pub use orchestrator::{Orchestrator, OrchestratorConfig, Scheduler};
pub use processor::{ItemProcessor, ProcessError, ProcessErrorKind, StageReporter};
pub use request::{AnyRecord, Failed, InProgress, Pending, ProcessingRequest, Record, RecordState, RequestStatus, Succeeded};
pub use retry::RetryConfig;
pub use storage::{ProgressDelta, Storage};
