//! Single-read body caching (§4.2, §9 "middleware body-read hazard").
//!
//! Reads the inbound body exactly once, bounded by `max_body_bytes` (hard
//! limit `hard_body_limit_bytes`), stashes both the raw bytes and the
//! decoded string under request extensions, and re-exposes the body to
//! the framework via a synthetic replay (`Body::from(bytes)`) so
//! downstream handlers see an ordinary, still-readable request. Any
//! second attempt to read the live body independently — rather than via
//! [`CachedBody::bytes`]/[`CachedBody::as_str`]/[`CachedBody::as_json`] —
//! is what the source ecosystem's "two middlewares read the body"
//! deadlock looks like; this type is the single point that owns the
//! read.

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use serde_json::Value;

use crate::errors::Error;

#[derive(Clone)]
pub struct CachedBody {
    bytes: Bytes,
}

impl CachedBody {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    pub fn as_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.bytes).ok()
    }
}

pub async fn cache_body_layer(max_body_bytes: u64, hard_limit_bytes: u64, request: Request, next: Next) -> Response {
    if !matches!(request.method(), &axum::http::Method::POST | &axum::http::Method::PUT | &axum::http::Method::PATCH) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let limit = hard_limit_bytes.min(u64::MAX) as usize;

    let bytes = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return too_large(format!("request body exceeds hard limit of {hard_limit_bytes} bytes"));
        }
    };

    if bytes.len() as u64 > max_body_bytes {
        return too_large(format!("request body of {} bytes exceeds max_body_bytes ({max_body_bytes})", bytes.len()));
    }

    let mut reconstructed = Request::from_parts(parts, Body::from(bytes.clone()));
    reconstructed.extensions_mut().insert(CachedBody { bytes });

    next.run(reconstructed).await
}

fn too_large(message: String) -> Response {
    use axum::response::IntoResponse;
    Error::PayloadTooLarge { message }.into_response()
}
