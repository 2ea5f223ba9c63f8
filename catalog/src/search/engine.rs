//! Search engine orchestration: fans out to the four strategies, merges,
//! filters, sorts, paginates, and caches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::ai::SharedAiClient;
use crate::config::SearchConfig;
use crate::db::{self, Material};
use crate::errors::{Error, Result};
use crate::fabric::routing::DataFabric;

use super::cursor::Cursor;
use super::fuzzy;
use super::highlight::highlight_material;
use super::query::{Pagination, SearchHit, SearchQuery, SearchResponse, SearchStrategy, SortField};

const SEARCH_CACHE_TTL: Duration = Duration::from_secs(300);
const FUZZY_CANDIDATE_SCAN_LIMIT: i64 = 500;

pub struct SearchEngine {
    ai: SharedAiClient,
    fabric: Arc<DataFabric>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(ai: SharedAiClient, fabric: Arc<DataFabric>, config: SearchConfig) -> Self {
        Self { ai, fabric, config }
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        query.validate().map_err(|message| Error::validation("query", message))?;

        let fingerprint = query.fingerprint();
        if let Some(cached) = self.fabric.cache.get(&fingerprint).await? {
            if let Ok(response) = serde_json::from_slice::<SearchResponse>(&cached) {
                return Ok(response);
            }
        }

        let response = self.execute(query, &fingerprint).await?;

        if let Ok(bytes) = serde_json::to_vec(&response) {
            self.fabric.cache.set(&fingerprint, bytes, Some(SEARCH_CACHE_TTL)).await?;
        }
        if response.source_strategy != SearchStrategy::Vector || !response.hits.is_empty() {
            if let Some(text) = &query.text {
                self.record_suggestion(text).await?;
            }
        }

        Ok(response)
    }

    async fn execute(&self, query: &SearchQuery, fingerprint: &str) -> Result<SearchResponse> {
        let text = query.text.clone().unwrap_or_default();
        let min_similarity = query.filters.min_similarity.unwrap_or(self.config.min_similarity);

        let (mut scored, actual_strategy) = match query.strategy {
            SearchStrategy::Vector => {
                let hits = self.vector_candidates(&text, min_similarity).await?;
                if hits.is_empty() {
                    (self.lexical_candidates(&text).await?, SearchStrategy::Lexical)
                } else {
                    (hits, SearchStrategy::Vector)
                }
            }
            SearchStrategy::Lexical => (self.lexical_candidates(&text).await?, SearchStrategy::Lexical),
            SearchStrategy::Fuzzy => (self.fuzzy_candidates(&text, query.fuzzy_threshold).await?, SearchStrategy::Fuzzy),
            SearchStrategy::Hybrid => (self.hybrid_candidates(&text, min_similarity, query.fuzzy_threshold).await?, SearchStrategy::Hybrid),
        };

        scored.retain(|(material, _)| query.filters.matches(material));

        self.sort_candidates(&mut scored, &query.sort);

        let (page, next_cursor) = self.paginate(&scored, &query.pagination, fingerprint)?;

        let hits = page
            .into_iter()
            .map(|(material, score)| SearchHit {
                highlights: if query.highlight {
                    query.text.as_ref().map(|text| highlight_material(text, &material))
                } else {
                    None
                },
                material,
                score,
                source_strategy: actual_strategy,
            })
            .collect();

        let suggestions = if query.include_suggestions { Some(self.recent_suggestions().await?) } else { None };

        Ok(SearchResponse {
            hits,
            total: Some(scored_len(&scored)),
            next_cursor,
            suggestions,
            source_strategy: actual_strategy,
        })
    }

    async fn vector_candidates(&self, text: &str, min_similarity: f32) -> Result<Vec<(Material, f32)>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = self.ai.embed(text).await?;
        let hits = self.fabric.vector_search("materials", &embedding.vector, 100, None).await?;
        let mut out = Vec::new();
        for hit in hits {
            if hit.normalized_score() < min_similarity {
                continue;
            }
            if let Some(material) = db::materials::get(&self.fabric.relational, hit.id).await? {
                out.push((material, hit.normalized_score()));
            }
        }
        Ok(out)
    }

    async fn lexical_candidates(&self, text: &str) -> Result<Vec<(Material, f32)>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.fabric.lexical_search(text, 100).await?;
        Ok(rows)
    }

    async fn fuzzy_candidates(&self, text: &str, threshold: f32) -> Result<Vec<(Material, f32)>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let candidates = db::materials::list(&self.fabric.relational, None, 0, FUZZY_CANDIDATE_SCAN_LIMIT).await?;
        Ok(candidates
            .into_iter()
            .filter_map(|material| {
                let score = fuzzy::score(text, &material);
                (score >= threshold).then_some((material, score))
            })
            .collect())
    }

    async fn hybrid_candidates(&self, text: &str, min_similarity: f32, fuzzy_threshold: f32) -> Result<Vec<(Material, f32)>> {
        let (vector, lexical, fuzzy) = tokio::join!(
            self.vector_candidates(text, min_similarity),
            self.lexical_candidates(text),
            self.fuzzy_candidates(text, fuzzy_threshold),
        );

        let weights = &self.config.hybrid_weights;
        let mut merged: HashMap<Uuid, (Material, f32)> = HashMap::new();

        let mut fold = |candidates: Result<Vec<(Material, f32)>>, weight: f32| {
            if let Ok(candidates) = candidates {
                for (material, score) in candidates {
                    let entry = merged.entry(material.id).or_insert_with(|| (material.clone(), 0.0));
                    entry.1 += score * weight;
                }
            }
        };

        fold(vector, weights.vector);
        fold(lexical, weights.lexical);
        fold(fuzzy, weights.fuzzy);

        Ok(merged.into_values().collect())
    }

    fn sort_candidates(&self, scored: &mut [(Material, f32)], sort: &[super::query::SortKey]) {
        scored.sort_by(|a, b| {
            for key in sort {
                let ordering = match key.field {
                    SortField::Relevance => a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal),
                    SortField::Name => a.0.name.cmp(&b.0.name),
                    SortField::CreatedAt => a.0.created_at.cmp(&b.0.created_at),
                    SortField::UpdatedAt => a.0.updated_at.cmp(&b.0.updated_at),
                    SortField::UseCategory => a.0.use_category.cmp(&b.0.use_category),
                };
                let ordering = match key.direction {
                    super::query::SortDirection::Asc => ordering,
                    super::query::SortDirection::Desc => ordering.reverse(),
                };
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            a.0.id.cmp(&b.0.id)
        });
    }

    fn paginate(&self, scored: &[(Material, f32)], pagination: &Pagination, fingerprint: &str) -> Result<(Vec<(Material, f32)>, Option<String>)> {
        match pagination {
            Pagination::Page { page, page_size } => {
                let start = ((page.saturating_sub(1)) * page_size) as usize;
                let end = (start + *page_size as usize).min(scored.len());
                let slice = if start < scored.len() { scored[start..end].to_vec() } else { Vec::new() };
                Ok((slice, None))
            }
            Pagination::Cursor { cursor, page_size } => {
                let start_after = match cursor {
                    Some(raw) => Some(Cursor::decode(raw, fingerprint).map_err(|message| Error::validation("cursor", message))?),
                    None => None,
                };

                let start_index = match &start_after {
                    Some(cursor) => scored
                        .iter()
                        .position(|(material, _)| material.id == cursor.last_id)
                        .map(|idx| idx + 1)
                        .unwrap_or(0),
                    None => 0,
                };

                let end = (start_index + *page_size as usize).min(scored.len());
                let slice = if start_index < scored.len() { scored[start_index..end].to_vec() } else { Vec::new() };

                let next_cursor = slice.last().map(|(material, score)| {
                    Cursor {
                        fingerprint: fingerprint.to_string(),
                        last_sort_value: score.to_string(),
                        last_id: material.id,
                    }
                    .encode()
                });

                Ok((slice, next_cursor))
            }
        }
    }

    async fn record_suggestion(&self, text: &str) -> Result<()> {
        self.fabric.cache.lpush("search:recent_suggestions", text.as_bytes().to_vec(), Some(50)).await?;
        Ok(())
    }

    async fn recent_suggestions(&self) -> Result<Vec<String>> {
        let raw = self.fabric.cache.lrange("search:recent_suggestions", 10).await?;
        let mut suggestions: Vec<String> = raw.into_iter().filter_map(|bytes| String::from_utf8(bytes).ok()).collect();

        let canonical = db::materials::list(&self.fabric.relational, None, 0, 10).await.unwrap_or_default();
        for material in canonical {
            if !suggestions.contains(&material.name) {
                suggestions.push(material.name);
            }
        }
        suggestions.truncate(10);
        Ok(suggestions)
    }

    /// Capped list of recent search terms plus canonical material names,
    /// for the suggestions endpoint.
    pub async fn suggestions(&self) -> Result<Vec<String>> {
        self.recent_suggestions().await
    }

    /// Conservatively invalidates the whole search cache namespace on
    /// any write to Materials (§4.9 allows the coarser invalidation).
    pub async fn invalidate_all(&self) -> Result<()> {
        self.fabric.cache.clear_namespace("search:").await?;
        Ok(())
    }
}

fn scored_len(scored: &[(Material, f32)]) -> u64 {
    scored.len() as u64
}
