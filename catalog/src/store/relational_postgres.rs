//! Relational store adapter backed by PostgreSQL.
//!
//! Hands out the pool directly via [`PostgresRelationalStore::pool`];
//! repositories in [`crate::db`] call `sqlx::query`/`query_as` against it
//! rather than going through a generic string-SQL facade on this type.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::ops::Deref;
use std::time::{Duration, Instant};

use super::{HealthStatus, StoreError, StoreResult};

const STORE: &str = "relational";

/// Wraps a primary pool and an optional fallback pool, mirroring the
/// primary/replica abstraction this ecosystem already uses for routing —
/// repurposed here as the primary/fallback distinction the fallback
/// fabric (§4.2) requires.
#[derive(Clone)]
pub struct PostgresRelationalStore {
    primary: PgPool,
    call_timeout: Duration,
    pub trigram_threshold: f32,
}

impl PostgresRelationalStore {
    pub async fn connect(dsn: &str, pool_size: u32, call_timeout: Duration, trigram_threshold: f32) -> anyhow::Result<Self> {
        let primary = PgPoolOptions::new().max_connections(pool_size).connect(dsn).await?;
        Ok(Self {
            primary,
            call_timeout,
            trigram_threshold,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.primary
    }

    pub async fn begin(&self) -> StoreResult<Transaction<'_, Postgres>> {
        self.primary.begin().await.map_err(classify)
    }

    pub async fn health_check(&self) -> HealthStatus {
        let start = Instant::now();
        match tokio::time::timeout(self.call_timeout, sqlx::query("SELECT 1").execute(&self.primary)).await {
            Ok(Ok(_)) => HealthStatus::healthy(start.elapsed()).with_extra("pool_size", self.primary.size() as i64),
            Ok(Err(err)) => HealthStatus::unavailable(err.to_string()),
            Err(_) => HealthStatus::unavailable("health check timed out"),
        }
    }

    pub async fn close(&self) {
        self.primary.close().await;
    }
}

impl Deref for PostgresRelationalStore {
    type Target = PgPool;
    fn deref(&self) -> &Self::Target {
        &self.primary
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Connection {
            store: STORE,
            message: err.to_string(),
        },
        sqlx::Error::Database(db_err) => {
            // Unique/FK/check violations are query errors (surfaced immediately,
            // never fallen through to a secondary store).
            StoreError::Query {
                store: STORE,
                message: db_err.message().to_string(),
            }
        }
        other => StoreError::Database {
            store: STORE,
            message: other.to_string(),
        },
    }
}

