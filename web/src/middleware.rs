//! Correlation id middleware.
//!
//! Every request gets an id: the client's `X-Correlation-ID` when it is a
//! valid UUID, a fresh one otherwise. The id is stored in the request
//! extensions (where [`CorrelationId`](crate::CorrelationId) finds it),
//! recorded on an `http_request` span wrapping the handler, and echoed on
//! the response.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/booths", get(list_booths))
//!     .layer(correlation_id_layer());
//! ```

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation id in both directions
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// The correlation id a client sent, if it is a valid UUID
#[must_use]
pub fn header_correlation_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
}

/// Layer installing [`CorrelationIdService`] around a router.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// See [`correlation_id_layer`]
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdService { inner }
    }
}

/// Tags each request with a correlation id and echoes it on the response
#[derive(Clone, Debug)]
pub struct CorrelationIdService<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let correlation_id = header_correlation_id(request.headers()).unwrap_or_else(Uuid::new_v4);
        request.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            %correlation_id,
            method = %request.method(),
            path = %request.uri().path(),
        );
        let response = self.inner.call(request).instrument(span);

        Box::pin(async move {
            let mut response = response.await?;
            if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}
