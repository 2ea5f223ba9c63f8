//! Query/result shapes for the hybrid search engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::db::Material;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Vector,
    Lexical,
    Fuzzy,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Relevance,
    Name,
    CreatedAt,
    UpdatedAt,
    UseCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Name,
    Description,
    UseCategory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filters {
    pub categories: BTreeSet<String>,
    pub units: BTreeSet<String>,
    pub sku_pattern: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
    pub search_fields: BTreeSet<SearchField>,
    pub min_similarity: Option<f32>,
}

impl Filters {
    pub fn matches(&self, material: &Material) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&material.use_category) {
            return false;
        }
        if !self.units.is_empty() && !self.units.contains(&material.unit) {
            return false;
        }
        if let Some(pattern) = &self.sku_pattern {
            let glob = glob::Pattern::new(pattern).ok();
            let sku_matches = material.sku.as_deref().map(|sku| glob.as_ref().map(|g| g.matches(sku)).unwrap_or(false)).unwrap_or(false);
            if !sku_matches {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if material.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if material.created_at > before {
                return false;
            }
        }
        if let Some(after) = self.updated_after {
            if material.updated_at < after {
                return false;
            }
        }
        if let Some(before) = self.updated_before {
            if material.updated_at > before {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Pagination {
    Page { page: u32, page_size: u32 },
    Cursor { cursor: Option<String>, page_size: u32 },
}

impl Pagination {
    pub fn page_size(&self) -> u32 {
        match self {
            Pagination::Page { page_size, .. } => *page_size,
            Pagination::Cursor { page_size, .. } => *page_size,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.page_size() == 0 || self.page_size() > 100 {
            return Err(format!("page_size must be in [1, 100], got {}", self.page_size()));
        }
        if let Pagination::Page { page, .. } = self {
            if *page < 1 {
                return Err("page must be >= 1".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub strategy: SearchStrategy,
    pub filters: Filters,
    pub sort: Vec<SortKey>,
    pub pagination: Pagination,
    pub fuzzy_threshold: f32,
    pub include_suggestions: bool,
    pub highlight: bool,
}

impl SearchQuery {
    pub fn validate(&self) -> Result<(), String> {
        self.pagination.validate()?;
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err("fuzzy_threshold must be in [0.0, 1.0]".to_string());
        }
        if self.fuzzy_threshold == 0.0 {
            return Err("fuzzy_threshold of 0.0 matches everything and is rejected".to_string());
        }
        Ok(())
    }

    /// Canonical fingerprint for the response cache: `H(strategy, text, filters, sort, pagination)`.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(self).unwrap_or_default());
        format!("search:{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Highlight {
    pub field: String,
    pub original: String,
    pub marked: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub material: Material,
    pub score: f32,
    pub source_strategy: SearchStrategy,
    pub highlights: Option<Vec<Highlight>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub total: Option<u64>,
    pub next_cursor: Option<String>,
    pub suggestions: Option<Vec<String>>,
    pub source_strategy: SearchStrategy,
}

pub type MaterialId = Uuid;
pub type ScoreMap = HashMap<MaterialId, f32>;
