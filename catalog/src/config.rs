//! Application configuration.
//!
//! Loaded from a YAML file with environment variable overrides, mirroring
//! the layering the nearest production analogue uses: YAML base, then
//! `CATALOG_`-prefixed env vars (double underscore for nesting), so e.g.
//! `CATALOG_RELATIONAL__DSN` overrides `relational.dsn`.
//!
//! This is the closed set of recognized options from spec §6; no other
//! knob is read at runtime.

use clap::Parser;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Construction materials catalog service")]
pub struct Args {
    /// Path to the YAML configuration file.
    #[arg(short = 'f', long, env = "CATALOG_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    pub batch_size: usize,
    pub cache_size: u64,
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
    pub max_concurrent_ai_calls: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 1536,
            batch_size: 50,
            cache_size: 128,
            cache_ttl: Duration::from_secs(3600),
            max_concurrent_ai_calls: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection_name: String,
    pub pool_size: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection_name: "materials".to_string(),
            pool_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationalConfig {
    pub dsn: String,
    pub pool_size: u32,
    pub trigram_threshold: f32,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            dsn: "postgres://localhost/catalog".to_string(),
            pool_size: 10,
            trigram_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtlConfig {
    pub search: u64,
    pub material: u64,
    pub health: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            search: 300,
            material: 3600,
            health: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl: CacheTtlConfig,
    pub pool_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: CacheTtlConfig::default(),
            pool_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_concurrent_batches: usize,
    pub inner_concurrency: usize,
    pub chunk_size: usize,
    pub retry_budget: u32,
    pub cleanup_ttl_days: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_batches: 10,
            inner_concurrency: 5,
            chunk_size: 100,
            retry_budget: 3,
            cleanup_ttl_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    pub vector: f32,
    pub lexical: f32,
    pub fuzzy: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            vector: 0.5,
            lexical: 0.3,
            fuzzy: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub min_similarity: f32,
    pub fuzzy_threshold: f32,
    pub hybrid_weights: HybridWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.3,
            fuzzy_threshold: 0.8,
            hybrid_weights: HybridWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub color_threshold: f32,
    pub unit_threshold: f32,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            color_threshold: 0.80,
            unit_threshold: 0.85,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkuConfig {
    pub confident_threshold: f32,
    pub weak_threshold: f32,
    pub candidates: usize,
}

impl Default for SkuConfig {
    fn default() -> Self {
        Self {
            confident_threshold: 0.88,
            weak_threshold: 0.75,
            candidates: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_upload_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { max_upload_bytes: 50 * 1024 * 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub max_body_bytes: u64,
    pub hard_body_limit_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
            hard_body_limit_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub batch_size: usize,
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
    pub exclude_paths: Vec<String>,
    pub sensitive_fields: Vec<String>,
    pub file_path: Option<PathBuf>,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval: Duration::from_millis(500),
            exclude_paths: vec!["/health".to_string()],
            sensitive_fields: super::observability::redaction::DEFAULT_SENSITIVE_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            file_path: None,
            json: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub header: String,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            header: "X-Correlation-ID".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: Option<String>,
    pub api_key: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub strict: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: String::new(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub embedding: EmbeddingConfig,
    pub vector: VectorConfig,
    pub relational: RelationalConfig,
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    pub search: SearchConfig,
    pub normalization: NormalizationConfig,
    pub sku: SkuConfig,
    pub ingest: IngestConfig,
    pub http: HttpConfig,
    pub log: LogConfig,
    pub correlation: CorrelationConfig,
    pub ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            embedding: EmbeddingConfig::default(),
            vector: VectorConfig::default(),
            relational: RelationalConfig::default(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
            search: SearchConfig::default(),
            normalization: NormalizationConfig::default(),
            sku: SkuConfig::default(),
            ingest: IngestConfig::default(),
            http: HttpConfig::default(),
            log: LogConfig::default(),
            correlation: CorrelationConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let figment = Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("CATALOG_").split("__"));

        let mut config: Config = figment.extract()?;

        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            config.relational.dsn = database_url;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = Config::default();
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.embedding.batch_size, 50);
        assert_eq!(config.batch.max_concurrent_batches, 10);
        assert_eq!(config.batch.inner_concurrency, 5);
        assert_eq!(config.batch.chunk_size, 100);
        assert_eq!(config.batch.retry_budget, 3);
        assert_eq!(config.batch.cleanup_ttl_days, 30);
        assert_eq!(config.search.min_similarity, 0.3);
        assert_eq!(config.search.fuzzy_threshold, 0.8);
        assert_eq!(config.normalization.color_threshold, 0.80);
        assert_eq!(config.normalization.unit_threshold, 0.85);
        assert_eq!(config.sku.confident_threshold, 0.88);
        assert_eq!(config.sku.weak_threshold, 0.75);
        assert_eq!(config.ingest.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.http.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.correlation.header, "X-Correlation-ID");
    }
}
