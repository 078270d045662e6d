//! Health check endpoints.
//!
//! `/health` answers as long as the process serves requests; readiness
//! aggregates component checks into one report.

use axum::{Json, http::StatusCode};
use boothbook_runtime::{HealthCheck, HealthReport, HealthStatus};
use serde::Serialize;

use crate::AppError;

/// Liveness response body
#[derive(Debug, Serialize)]
pub struct Liveness {
    /// Always `"ok"` while the process is serving requests
    pub status: &'static str,
}

/// Simple health check endpoint (for basic liveness).
///
/// Does NOT check dependencies (database, stores).
///
/// ```text
/// GET /health → 200 {"status":"ok"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<Liveness>) {
    (StatusCode::OK, Json(Liveness { status: "ok" }))
}

/// Map a health status to the HTTP status a load balancer expects.
const fn http_status(status: HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Render an aggregated report from several component checks.
#[must_use]
pub fn health_report(checks: Vec<HealthCheck>) -> (StatusCode, Json<HealthReport>) {
    let report = HealthReport::new(checks);
    (http_status(report.status), Json(report))
}

/// Fallback for unknown routes.
#[allow(clippy::unused_async)]
pub async fn route_not_found() -> AppError {
    AppError::not_found("Route")
}
