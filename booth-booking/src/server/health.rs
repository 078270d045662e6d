//! Health check endpoints for the booth booking server.
//!
//! `/health` is the bare liveness check from the web crate. `/ready` checks
//! the booth ledger store and the database. `/api/health` and `/api/test`
//! are the checks the browser client calls.

use super::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use boothbook_core::environment::Clock;
use boothbook_runtime::{HealthCheck, HealthReport};
use boothbook_web::handlers::health_report;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Response of `/api/health`
#[derive(Debug, Serialize)]
pub struct ApiHealth {
    /// Always `"OK"`
    pub status: &'static str,
    /// Human message
    pub message: &'static str,
    /// Server time
    pub timestamp: DateTime<Utc>,
}

/// Response of `/api/test`
#[derive(Debug, Serialize)]
pub struct ApiTest {
    /// Human message
    pub message: &'static str,
    /// Server time
    pub timestamp: DateTime<Utc>,
}

/// Readiness check endpoint.
///
/// Returns 200 while the ledger store accepts commands and storage answers,
/// 503 otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3000/ready
/// # {"status":"healthy","checks":[{"component":"store",...},{"component":"database",...}]}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = match state.repositories.ledger.ping().await {
        Ok(()) => HealthCheck::healthy("database"),
        Err(error) => {
            tracing::warn!(error = %error, "Database ping failed");
            HealthCheck::unhealthy("database", error.to_string())
        },
    };

    health_report(vec![state.ledger.health(), database])
}

/// Client-facing health check.
pub async fn api_health(State(state): State<AppState>) -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "OK",
        message: "Server is running",
        timestamp: state.clock.now(),
    })
}

/// Client-facing connectivity test.
pub async fn api_test(State(state): State<AppState>) -> Json<ApiTest> {
    Json(ApiTest {
        message: "API server is working!",
        timestamp: state.clock.now(),
    })
}
