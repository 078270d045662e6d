//! Axum integration for the booth booking platform.
//!
//! Handlers stay thin: they extract data from the request, either call a
//! repository or dispatch an action through a `Store`, and map the outcome
//! to an HTTP response.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract data** from the request (JSON, headers, bearer token)
//! 3. **Build Action** from extracted data
//! 4. **Dispatch** the action through a `Store` and wait for its outcome
//! 5. **Map result** to an HTTP response (or an [`AppError`])
//!
//! # Example
//!
//! ```ignore
//! use boothbook_web::{AppError, WebResult};
//! use axum::{Router, routing::get, Json};
//!
//! async fn get_booth(
//!     State(state): State<AppState>,
//!     Path(id): Path<String>,
//! ) -> WebResult<Json<BoothResponse>> {
//!     let booth = state.find_booth(&id).await
//!         .ok_or_else(|| AppError::not_found("Booth"))?;
//!     Ok(Json(booth))
//! }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::CorrelationId;
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer, header_correlation_id};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
