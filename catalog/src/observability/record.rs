//! Structured log record shape emitted by every logical operation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub ts: DateTime<Utc>,
    pub level: String,
    pub logger: String,
    pub correlation_id: Option<String>,
    pub message: String,
    pub fields: BTreeMap<String, Value>,
}

impl LogRecord {
    pub fn new(level: impl Into<String>, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            level: level.into(),
            logger: logger.into(),
            correlation_id: super::correlation::current(),
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}
