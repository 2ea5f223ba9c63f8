//! Health surface: basic liveness and a detailed per-store breakdown
//! (§6). `207` is used when some but not all stores are healthy.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;

use crate::app_state::AppState;
use crate::store::HealthState;

use super::envelope_response;

#[derive(Serialize)]
struct BasicHealth {
    status: &'static str,
}

pub async fn basic() -> Response {
    envelope_response(StatusCode::OK, BasicHealth { status: "ok" })
}

pub async fn detailed(State(state): State<AppState>) -> Response {
    let checks = state.fabric.health().await;

    let all_healthy = checks.values().all(|status| status.status == HealthState::Healthy);
    let any_healthy = checks.values().any(|status| status.status == HealthState::Healthy);

    let status_code = if all_healthy {
        StatusCode::OK
    } else if any_healthy {
        StatusCode::from_u16(207).unwrap()
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let degraded = state.fabric.is_processing_degraded();
    envelope_response(
        status_code,
        serde_json::json!({
            "stores": checks,
            "processing_degraded": degraded,
        }),
    )
}
