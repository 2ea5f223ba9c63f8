//! Observability core (C11): correlation ids, structured log records, and
//! an async batched sink, layered on top of `tracing` rather than
//! replacing it — `tracing` gives us developer-facing spans/events,
//! this module gives us the durable, redacted, batched record stream
//! the spec actually puts invariants on (batch size, flush interval,
//! drop-on-failure, sensitive-field masking).

pub mod correlation;
pub mod record;
pub mod redaction;
pub mod sink;

pub use correlation::{correlation_layer, CorrelationId};
pub use record::LogRecord;
pub use sink::{ConsoleSink, LogSink, ObservabilityCore, RotatingFileSink};
