//! Shared pagination request/response shapes for list-style endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct SkipLimitQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub category: Option<String>,
}

fn default_limit() -> u64 {
    50
}

impl SkipLimitQuery {
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == 0 || self.limit > 100 {
            return Err(format!("limit must be in [1, 100], got {}", self.limit));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}
