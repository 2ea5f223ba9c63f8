//! Route handlers, one module per HTTP surface from §6.

pub mod health;
pub mod ingestion;
pub mod materials;
pub mod processing;
pub mod reference;
pub mod search;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::models::envelope::Envelope;

/// Wraps a success payload in the stable envelope at the given status code.
pub fn envelope_response<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(Envelope::ok(data))).into_response()
}

pub fn ok<T: Serialize>(data: T) -> Response {
    envelope_response(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> Response {
    envelope_response(StatusCode::CREATED, data)
}
