//! Fallback fabric (C2): primary -> fallback routing for reads, writes,
//! and batch-progress, plus the cached-body helper.
//!
//! Store routing and body caching are independent concerns but share a
//! module because both exist to keep the rest of the service ignorant
//! of which store is actually serving a given call.

pub mod cached_body;
pub mod routing;

pub use cached_body::CachedBody;
pub use routing::{DataFabric, OperationKind};
