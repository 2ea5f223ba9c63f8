//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for every surface in the
//!   external interface (materials, search, ingestion, reference,
//!   processing, health)
//! - **[`models`]**: Request/response data structures
//!
//! [`router`] wires handlers, state, and the two structural middlewares
//! (single-read body caching, correlation id propagation) into one
//! `axum::Router`.

pub mod handlers;
pub mod models;

use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::app_state::AppState;
use crate::fabric::cached_body::cache_body_layer;
use crate::observability::correlation_layer;

pub fn router(state: AppState) -> Router {
    let max_body_bytes = state.config.http.max_body_bytes;
    let hard_body_limit_bytes = state.config.http.hard_body_limit_bytes;
    let body_cache_layer = middleware::from_fn(move |req, next| cache_body_layer(max_body_bytes, hard_body_limit_bytes, req, next));

    let header_name = HeaderName::from_bytes(state.config.correlation.header.as_bytes()).unwrap_or(HeaderName::from_static("x-correlation-id"));
    let correlation_middleware = middleware::from_fn(move |req, next| {
        let header_name = header_name.clone();
        async move { correlation_layer(header_name, req, next).await }
    });

    let materials_routes = Router::new()
        .route("/materials", post(handlers::materials::create).get(handlers::materials::list))
        .route("/materials/batch", post(handlers::materials::batch_create))
        .route(
            "/materials/{id}",
            get(handlers::materials::get).put(handlers::materials::update).delete(handlers::materials::delete),
        );

    let search_routes = Router::new()
        .route("/search", get(handlers::search::simple).post(handlers::search::advanced))
        .route("/search/suggestions", get(handlers::search::suggestions));

    let ingestion_routes = Router::new().route("/ingest/upload", post(handlers::ingestion::upload));

    let reference_routes = Router::new()
        .route("/reference/categories", get(handlers::reference::list_categories).post(handlers::reference::create_category))
        .route("/reference/categories/{id}", axum::routing::delete(handlers::reference::delete_category))
        .route("/reference/units", get(handlers::reference::list_units).post(handlers::reference::create_unit))
        .route("/reference/units/{id}", axum::routing::delete(handlers::reference::delete_unit));

    let processing_routes = Router::new()
        .route("/processing/batches", post(handlers::processing::submit))
        .route("/processing/batches/{id}", get(handlers::processing::status))
        .route("/processing/batches/{id}/results", get(handlers::processing::results))
        .route("/processing/batches/{id}/retry", post(handlers::processing::retry))
        .route("/processing/batches/{id}/cancel", post(handlers::processing::cancel))
        .route("/processing/stats", get(handlers::processing::stats))
        .route("/processing/cleanup", post(handlers::processing::cleanup));

    let health_routes = Router::new()
        .route("/health", get(handlers::health::basic))
        .route("/health/detailed", get(handlers::health::detailed));

    // The single-read body cache is meant for small JSON request bodies
    // (validation/logging); a multipart file upload is bounded instead by
    // `ingest.max_upload_bytes` inside its own handler, so it is excluded
    // here rather than getting rejected by the smaller `http.max_body_bytes`.
    let cached_routes = Router::new()
        .merge(materials_routes)
        .merge(search_routes)
        .merge(reference_routes)
        .merge(processing_routes)
        .merge(health_routes)
        .layer(body_cache_layer);

    Router::new()
        .merge(cached_routes)
        .merge(ingestion_routes)
        .with_state(state)
        .layer(correlation_middleware)
}
