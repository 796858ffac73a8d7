//! Liveness and readiness checks

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use core_kernel::{HealthCheckResult, HealthCheckable};

use crate::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<HealthCheckResult>,
}

/// Process is up; touches no adapter
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive",
        version: VERSION,
        store: None,
    })
}

/// Checks the lifecycle store
///
/// Answers 503 with the store report while the store is degraded or down.
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    let report = state.store.health_check().await;
    let ready = report.is_healthy();
    if !ready {
        warn!(
            adapter = %report.adapter_id,
            latency_ms = report.latency_ms,
            message = ?report.message,
            "Lifecycle store not ready"
        );
    }

    let body = HealthResponse {
        status: if ready { "ready" } else { "unavailable" },
        version: VERSION,
        store: Some(report),
    };
    let code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(body)).into_response()
}
