//! The stable HTTP response envelope used by every endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<ErrorDetails>,
}

#[derive(Serialize)]
pub struct ErrorDetails {
    pub correlation_id: Option<String>,
}

#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(code: &str, message: String, correlation_id: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: code.to_string(),
                message,
                details: Some(ErrorDetails { correlation_id }),
            }),
            timestamp: Utc::now(),
        }
    }
}
