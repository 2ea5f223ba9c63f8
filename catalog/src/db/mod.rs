//! Typed repository layer over the relational store.
//!
//! Each submodule owns one table's row type and the `sqlx` queries
//! against it; callers go through [`crate::store::PostgresRelationalStore`]
//! for the pool, never raw SQL strings outside this module.

pub mod categories;
pub mod materials;
pub mod models;
pub mod processing_store;
pub mod raw_products;
pub mod units;

pub use models::*;
pub use processing_store::PostgresProcessingStore;

use crate::store::StoreError;

const STORE: &str = "relational";

/// Shared `sqlx::Error` -> `StoreError` classification for repository
/// queries that go through `sqlx::query`/`query_as` directly (connection
/// pool exhaustion and I/O are fall-through eligible, everything else
/// surfaces immediately).
pub(crate) fn classify_for_pool(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Connection {
            store: STORE,
            message: err.to_string(),
        },
        sqlx::Error::Database(db_err) => StoreError::Query {
            store: STORE,
            message: db_err.message().to_string(),
        },
        other => StoreError::Database {
            store: STORE,
            message: other.to_string(),
        },
    }
}
