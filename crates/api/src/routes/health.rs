//! Health check endpoint.
//!
//! This process serves both the HTTP API and the settlement worker
//! pool, so the body names the service and its version for probes
//! that watch several deployments.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// GET /health — liveness of the combined API and worker process.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "payments-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}
