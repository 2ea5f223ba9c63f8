//! Wires every adapter, stage, and orchestration piece into one shared
//! handle (`AppState`) and implements the [`enrichment::ItemProcessor`]
//! that drives a single row through parse -> normalize -> assign SKU ->
//! persist (§4.8).

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use enrichment::{OrchestratorConfig, ProcessError, ProcessErrorKind, RequestId, RetryConfig, Scheduler, Stage, StageReporter};

use crate::ai::{OpenAiEmbeddingClient, SharedAiClient};
use crate::config::Config;
use crate::db::{Material, PostgresProcessingStore};
use crate::errors::Error;
use crate::fabric::routing::DataFabric;
use crate::ingest::IngestionFrontDoor;
use crate::normalize::NormalizationStage;
use crate::observability::{ConsoleSink, LogSink, ObservabilityCore, RotatingFileSink};
use crate::parser::ParserStage;
use crate::reference::ReferenceCollections;
use crate::search::SearchEngine;
use crate::sku::{new_material_id, SkuAssignmentStage};
use crate::store::{CacheStore, MokaCacheStore, PostgresRelationalStore, QdrantVectorStore, VectorStore};

/// Drives one catalog row through the per-item pipeline. Holds only the
/// stages and the fabric; the orchestrator (enrichment crate) owns
/// retries, concurrency, and progress bookkeeping.
pub struct CatalogItemProcessor {
    parser: Arc<ParserStage>,
    normalizer: Arc<NormalizationStage>,
    sku_stage: Arc<SkuAssignmentStage>,
    refs: Arc<ReferenceCollections>,
    fabric: Arc<DataFabric>,
}

impl CatalogItemProcessor {
    pub fn new(parser: Arc<ParserStage>, normalizer: Arc<NormalizationStage>, sku_stage: Arc<SkuAssignmentStage>, refs: Arc<ReferenceCollections>, fabric: Arc<DataFabric>) -> Self {
        Self {
            parser,
            normalizer,
            sku_stage,
            refs,
            fabric,
        }
    }
}

fn field_str(input: &serde_json::Value, field: &str) -> Option<String> {
    input.get(field).and_then(|v| v.as_str()).map(str::to_string)
}

/// Maps the catalog's own error taxonomy onto the orchestrator's
/// transient/permanent split: anything fall-through-eligible at the
/// store layer, or an explicit timeout/unavailable dependency, is worth
/// retrying; everything else (bad input, conflicts, internal bugs) is not.
fn to_process_error(err: Error) -> ProcessError {
    match &err {
        Error::Timeout { .. } | Error::Unavailable { .. } => ProcessError::transient(err.to_string()),
        Error::Store(store_err) if store_err.is_fallthrough_eligible() => ProcessError::transient(err.to_string()),
        _ => ProcessError::permanent(err.to_string()),
    }
}

#[async_trait]
impl enrichment::ItemProcessor for CatalogItemProcessor {
    async fn process(&self, material_key: &str, input: serde_json::Value, reporter: &(dyn StageReporter + Send + Sync)) -> Result<serde_json::Value, ProcessError> {
        let name = field_str(&input, "name").ok_or_else(|| ProcessError::permanent(format!("{material_key}: missing name")))?;
        let raw_unit = field_str(&input, "unit");
        let use_category = field_str(&input, "use_category").unwrap_or_default();
        let supplied_sku = field_str(&input, "sku");

        reporter.report_stage(Stage::Parsing);
        let parsed = self.parser.parse(&name, raw_unit.as_deref()).await.map_err(to_process_error)?;

        reporter.report_stage(Stage::Normalizing);
        let normalized_color = self
            .normalizer
            .normalize_color(parsed.color.as_deref(), &self.refs)
            .await
            .map_err(to_process_error)?;
        let normalized_unit = self
            .normalizer
            .normalize_unit(parsed.parsed_unit.as_deref().or(raw_unit.as_deref()), &self.refs)
            .await
            .map_err(to_process_error)?;

        let canonical_color = normalized_color.as_ref().and_then(|f| f.canonical_name.clone());
        let canonical_unit = normalized_unit
            .as_ref()
            .and_then(|f| f.canonical_name.clone())
            .or(raw_unit.clone())
            .ok_or_else(|| ProcessError::permanent(format!("{material_key}: no unit could be determined")))?;

        reporter.report_stage(Stage::AssigningSku);
        let (assignment, embedding) = self
            .sku_stage
            .assign(&name, &use_category, &canonical_unit, parsed.parsed_unit.as_deref(), canonical_color.as_deref(), &self.refs)
            .await
            .map_err(to_process_error)?;

        reporter.report_stage(Stage::Persisting);
        let now = Utc::now();
        let material = Material {
            id: new_material_id(),
            name: name.clone(),
            use_category,
            unit: canonical_unit,
            sku: supplied_sku.or(assignment.sku.clone()),
            description: None,
            embedding,
            created_at: now,
            updated_at: now,
        };

        self.fabric.persist_material(&material).await.map_err(|e| to_process_error(Error::Store(e)))?;

        reporter.report_stage(Stage::Done);
        Ok(serde_json::json!({
            "material_id": material.id,
            "sku": material.sku,
            "sku_confidence": format!("{:?}", assignment.confidence),
            "self_seeded": assignment.self_seeded,
            "color": canonical_color,
            "normalization_failed": parsed.low_confidence,
        }))
    }
}

/// Everything a request handler needs: adapters, stages, and the
/// scheduler handle to submit work into the orchestrator.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fabric: Arc<DataFabric>,
    pub ai: SharedAiClient,
    pub refs: Arc<ReferenceCollections>,
    pub search: Arc<SearchEngine>,
    pub storage: Arc<PostgresProcessingStore>,
    pub ingestion: Arc<IngestionFrontDoor<PostgresProcessingStore>>,
    pub scheduler_tx: mpsc::Sender<RequestId>,
    pub observability: ObservabilityCore,
    pub reaper_shutdown: CancellationToken,
}

impl AppState {
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let vector: Arc<dyn VectorStore> = Arc::new(QdrantVectorStore::connect(&config.vector.url, config.vector.api_key.as_deref(), Duration::from_secs(5))?);
        let relational = Arc::new(PostgresRelationalStore::connect(&config.relational.dsn, config.relational.pool_size, Duration::from_secs(5), config.relational.trigram_threshold).await?);
        let cache: Arc<dyn CacheStore> = Arc::new(MokaCacheStore::new(10_000));

        let fabric = Arc::new(DataFabric::new(vector.clone(), relational.clone(), cache));

        let ai: SharedAiClient = Arc::new(OpenAiEmbeddingClient::new(
            &config.ai,
            config.embedding.dimension,
            config.embedding.batch_size,
            config.embedding.max_concurrent_ai_calls,
            config.embedding.cache_size,
            config.embedding.cache_ttl,
        ));

        let refs = Arc::new(ReferenceCollections::new(vector.clone(), ai.clone()));
        refs.seed_defaults().await?;

        let parser = Arc::new(ParserStage::new(&config.ai));
        let normalizer = Arc::new(NormalizationStage::new(ai.clone(), config.normalization.color_threshold, config.normalization.unit_threshold));
        let sku_stage = Arc::new(SkuAssignmentStage::new(ai.clone(), config.sku.confident_threshold, config.sku.weak_threshold, config.sku.candidates));

        let search = Arc::new(SearchEngine::new(ai.clone(), fabric.clone(), config.search.clone()));

        let storage = Arc::new(PostgresProcessingStore::new(fabric.clone()));
        let ingestion = Arc::new(IngestionFrontDoor::new(storage.clone(), config.batch.cleanup_ttl_days));

        let processor = Arc::new(CatalogItemProcessor::new(parser, normalizer, sku_stage, refs.clone(), fabric.clone()));

        let orchestrator_config = OrchestratorConfig {
            max_concurrent_batches: config.batch.max_concurrent_batches,
            inner_concurrency: config.batch.inner_concurrency,
            chunk_size: config.batch.chunk_size,
            retry: RetryConfig {
                max_retries: config.batch.retry_budget,
                ..RetryConfig::default()
            },
        };
        let scheduler = Arc::new(Scheduler::new(storage.clone(), processor, orchestrator_config));
        let scheduler_tx = scheduler.spawn();

        let mut sinks: Vec<Arc<dyn LogSink>> = vec![Arc::new(ConsoleSink)];
        if let Some(path) = &config.log.file_path {
            sinks.push(Arc::new(RotatingFileSink::new(path.clone())));
        }
        let observability = ObservabilityCore::spawn(sinks, config.log.sensitive_fields.clone(), config.log.batch_size, config.log.flush_interval);

        let reaper_shutdown = CancellationToken::new();
        tokio::spawn(enrichment::cleanup::run_reaper(
            storage.clone(),
            Duration::from_secs(config.batch.cleanup_ttl_days * 86_400),
            Duration::from_secs(3600),
            reaper_shutdown.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            fabric,
            ai,
            refs,
            search,
            storage,
            ingestion,
            scheduler_tx,
            observability,
            reaper_shutdown,
        })
    }
}
