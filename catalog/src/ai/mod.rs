//! AI client abstraction (C4): embedding generation, batching, LRU cache,
//! deterministic fallback.

pub mod fallback;
pub mod openai_client;

pub use openai_client::OpenAiEmbeddingClient;

use async_trait::async_trait;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{Error, Result};

/// Normalizes input the same way before hashing for the cache key and
/// before sending to the provider: trim, collapse internal whitespace,
/// casefold.
pub fn normalize_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

pub fn cache_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether a vector was produced by the real provider or by the
/// deterministic fallback hash — downstream stages consult this when
/// `ai.strict` is configured to refuse persisting fallback vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingSource {
    Provider,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub source: EmbeddingSource,
}

#[async_trait]
pub trait AiClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;
    async fn health_check(&self) -> crate::store::HealthStatus;
    fn dimension(&self) -> usize;

    /// Whether downstream stages must refuse to persist a fallback vector
    /// instead of silently accepting it. Defaults to permissive.
    fn strict(&self) -> bool {
        false
    }
}

/// Process-wide LRU cache of normalized-text-hash -> vector, shared by
/// any `AiClient` implementation. Size and TTL come from `embedding.*`
/// configuration.
pub struct EmbeddingCache {
    inner: Cache<String, Vec<f32>>,
}

impl EmbeddingCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(capacity.max(128)).time_to_live(ttl).build(),
        }
    }

    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.inner.get(&cache_key(text)).await
    }

    pub async fn put(&self, text: &str, vector: Vec<f32>) {
        self.inner.insert(cache_key(text), vector).await;
    }
}

/// Validates a provider response's dimension; mismatch is a fatal
/// configuration error, not a retryable one.
pub fn validate_dimension(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::internal(anyhow::anyhow!(
            "embedding dimension mismatch: got {}, configured {}",
            vector.len(),
            expected
        )));
    }
    Ok(())
}

pub type SharedAiClient = Arc<dyn AiClient>;
