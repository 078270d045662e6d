//! Error types for web handlers.
//!
//! [`AppError`] bridges domain errors and HTTP responses. The JSON body
//! carries the message under both `message` and `error`, which is what the
//! browser client reads:
//!
//! ```text
//! 404 {"code":"NOT_FOUND","message":"Booth not found","error":"Booth not found"}
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use boothbook_runtime::StoreError;
use serde::Serialize;
use std::fmt;

/// An HTTP error with a user-facing message and an optional internal cause.
///
/// The cause is logged for 5xx responses and never sent to the client.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: String,
    source: Option<anyhow::Error>,
}

/// `NOT_FOUND` for 404, `SERVICE_UNAVAILABLE` for 503, ...
fn code_for(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("ERROR")
        .to_uppercase()
        .replace([' ', '-'], "_")
}

impl AppError {
    /// An error with an explicit machine code.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// An error whose code is derived from the status.
    #[must_use]
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, message.into(), code_for(status))
    }

    /// Attach the internal cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Machine-readable code
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// 400
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    /// 401
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, message)
    }

    /// 403
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, message)
    }

    /// 404, e.g. `not_found("Booth")` is "Booth not found".
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, format!("{resource} not found"))
    }

    /// 409
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, message)
    }

    /// 500
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// 503
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    error: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            let cause = self.source.as_ref().map(ToString::to_string);
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                cause = cause.as_deref().unwrap_or("-"),
                "Request failed"
            );
        }

        let body = ErrorBody {
            code: &self.code,
            message: &self.message,
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// A store that cannot answer in time is reported as temporarily unavailable.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = match err {
            StoreError::Timeout => "The request timed out, please retry",
            StoreError::ShutdownInProgress | StoreError::ShutdownTimeout(_) => {
                "Service is shutting down"
            },
            StoreError::ChannelClosed => "Service is unavailable",
        };
        Self::unavailable(message).with_source(err.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_status() {
        assert_eq!(AppError::bad_request("x").code(), "BAD_REQUEST");
        assert_eq!(AppError::internal("x").code(), "INTERNAL_SERVER_ERROR");
        assert_eq!(AppError::unavailable("x").code(), "SERVICE_UNAVAILABLE");
        assert_eq!(
            AppError::with_status(StatusCode::PAYMENT_REQUIRED, "x").code(),
            "PAYMENT_REQUIRED"
        );
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = AppError::not_found("Booth");
        assert_eq!(err.to_string(), "[NOT_FOUND] Booth not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_timeout_is_unavailable() {
        let err = AppError::from(StoreError::Timeout);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn body_carries_message_and_error() {
        let response = AppError::forbidden("Admin access required").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(body["message"], "Admin access required");
        assert_eq!(body["error"], "Admin access required");
    }
}
