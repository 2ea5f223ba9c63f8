//! Request shapes for the search surface: a simple `?q=&limit=` query
//! and the full advanced `SearchQuery` body (§6).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleSearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestQuery {
    pub q: Option<String>,
    #[serde(default = "default_suggest_limit")]
    pub limit: usize,
}

fn default_suggest_limit() -> usize {
    10
}
