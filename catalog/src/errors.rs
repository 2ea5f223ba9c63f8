//! Error hierarchy and HTTP response conversion.
//!
//! Every variant maps to one of the error kinds in the spec's error
//! taxonomy (`ValidationError`, `NotFound`, `Conflict`,
//! `PreconditionFailed`, `Timeout`, `Unavailable`, `Internal`) and is
//! rendered through the standard response envelope (`success`, `data`,
//! `error{code, message, details}`, `timestamp`).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error as ThisError;

use crate::api::models::envelope::Envelope;
use crate::store::StoreError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{resource} with id {id} not found")]
    NotFound { resource: String, id: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("precondition failed: {message}")]
    PreconditionFailed { message: String },

    #[error("operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("{resource} unavailable: {message}")]
    Unavailable { resource: String, message: String },

    #[error("payload too large: {message}")]
    PayloadTooLarge { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl Error {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Error::Internal(err.into())
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for `error.code` in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "VALIDATION_ERROR",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Conflict { .. } => "CONFLICT",
            Error::PreconditionFailed { .. } => "PRECONDITION_FAILED",
            Error::Timeout { .. } => "TIMEOUT",
            Error::Unavailable { .. } => "UNAVAILABLE",
            Error::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Error::Store(store_err) => store_err.code(),
            Error::Internal(_) => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Store(store_err) => store_err.status_code(),
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorDetails {
    correlation_id: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Internal(err) => tracing::error!(error = %err, "internal error"),
            Error::Store(StoreError::Connection { .. } | StoreError::Timeout { .. }) => {
                tracing::warn!(error = %self, "store unavailable")
            }
            Error::Unavailable { .. } | Error::Timeout { .. } => tracing::warn!(error = %self, "dependency degraded"),
            _ => tracing::debug!(error = %self, "client error"),
        }

        let status = self.status_code();
        let correlation_id = crate::observability::correlation::current();
        let envelope = Envelope::<()>::error(self.code(), self.to_string(), correlation_id);
        (status, Json(envelope)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
