//! Hybrid search engine (C9): vector/lexical/fuzzy/hybrid strategies,
//! filtering, sorting, pagination, highlighting, suggestions, caching.

pub mod cursor;
pub mod engine;
pub mod fuzzy;
pub mod highlight;
pub mod query;

pub use engine::SearchEngine;
pub use query::{Filters, Pagination, SearchHit, SearchQuery, SearchStrategy, SortField, SortKey};
