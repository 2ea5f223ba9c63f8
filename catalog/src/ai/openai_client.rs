//! Embedding client backed by an OpenAI-compatible provider.

use async_openai::config::OpenAIConfig;
use async_openai::types::embeddings::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::config::AiConfig;
use crate::errors::{Error, Result};
use crate::store::HealthStatus;

use super::{fallback::fallback_vector, validate_dimension, AiClient, Embedding, EmbeddingCache, EmbeddingSource};

pub struct OpenAiEmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
    max_batch_size: usize,
    strict: bool,
    call_timeout: Duration,
    concurrency: Semaphore,
    cache: EmbeddingCache,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: &AiConfig, dimension: usize, max_batch_size: usize, max_concurrent_calls: usize, cache_size: u64, cache_ttl: Duration) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }
        Self {
            client: Client::with_config(openai_config),
            model: config.embedding_model.clone(),
            dimension,
            max_batch_size,
            strict: config.strict,
            call_timeout: Duration::from_secs(30),
            concurrency: Semaphore::new(max_concurrent_calls.max(1)),
            cache: EmbeddingCache::new(cache_size, cache_ttl),
        }
    }

    async fn embed_via_provider(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let _permit = self.concurrency.acquire().await.map_err(|e| Error::internal(anyhow::anyhow!(e)))?;

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .build()
            .map_err(|e| Error::internal(anyhow::anyhow!(e)))?;

        let response = tokio::time::timeout(self.call_timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| Error::Timeout {
                operation: "ai.embed".to_string(),
            })?
            .map_err(|e| Error::Unavailable {
                resource: "ai".to_string(),
                message: e.to_string(),
            })?;

        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        Ok(vectors)
    }
}

#[async_trait]
impl AiClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if let Some(vector) = self.cache.get(text).await {
            return Ok(Embedding {
                vector,
                source: EmbeddingSource::Provider,
            });
        }

        match self.embed_via_provider(std::slice::from_ref(&text.to_string())).await {
            Ok(mut vectors) => {
                let vector = vectors.pop().ok_or_else(|| Error::internal(anyhow::anyhow!("empty embedding response")))?;
                validate_dimension(&vector, self.dimension)?;
                self.cache.put(text, vector.clone()).await;
                Ok(Embedding {
                    vector,
                    source: EmbeddingSource::Provider,
                })
            }
            Err(_) => {
                let vector = fallback_vector(text, self.dimension);
                Ok(Embedding {
                    vector,
                    source: EmbeddingSource::Fallback,
                })
            }
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut results = Vec::with_capacity(texts.len());
        // Batches run sequentially to respect upstream rate limits.
        for chunk in texts.chunks(self.max_batch_size.max(1)) {
            let mut to_fetch = Vec::new();
            let mut cached: Vec<Option<Vec<f32>>> = Vec::with_capacity(chunk.len());
            for text in chunk {
                let hit = self.cache.get(text).await;
                if hit.is_none() {
                    to_fetch.push(text.clone());
                }
                cached.push(hit);
            }

            let fetched = if to_fetch.is_empty() {
                Ok(Vec::new())
            } else {
                self.embed_via_provider(&to_fetch).await
            };

            match fetched {
                Ok(vectors) => {
                    let mut fetched_iter = vectors.into_iter();
                    for (text, slot) in chunk.iter().zip(cached.into_iter()) {
                        let vector = match slot {
                            Some(v) => v,
                            None => {
                                let v = fetched_iter.next().ok_or_else(|| Error::internal(anyhow::anyhow!("embedding batch short response")))?;
                                validate_dimension(&v, self.dimension)?;
                                self.cache.put(text, v.clone()).await;
                                v
                            }
                        };
                        results.push(Embedding {
                            vector,
                            source: EmbeddingSource::Provider,
                        });
                    }
                }
                Err(_) => {
                    for text in chunk {
                        results.push(Embedding {
                            vector: fallback_vector(text, self.dimension),
                            source: EmbeddingSource::Fallback,
                        });
                    }
                }
            }
        }
        Ok(results)
    }

    async fn health_check(&self) -> HealthStatus {
        let start = Instant::now();
        let probe = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String("health check".to_string()))
            .build();

        let Ok(request) = probe else {
            return HealthStatus::unavailable("failed to build health check request");
        };

        match tokio::time::timeout(self.call_timeout, self.client.embeddings().create(request)).await {
            Ok(Ok(_)) => HealthStatus::healthy(start.elapsed()),
            Ok(Err(err)) => HealthStatus::unavailable(err.to_string()),
            Err(_) => HealthStatus::unavailable("ai health check timed out"),
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn strict(&self) -> bool {
        self.strict
    }
}

impl std::fmt::Debug for OpenAiEmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddingClient")
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("strict", &self.strict)
            .finish()
    }
}
