//! Request extractors shared by every handler.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::middleware::header_correlation_id;

/// The id a request's log lines and store actions are tagged with.
///
/// Resolution order:
/// 1. the id [`correlation_id_layer`](crate::correlation_id_layer) stored in
///    the request extensions, so the handler and the response header agree
/// 2. a valid UUID in the `X-Correlation-ID` header
/// 3. a fresh UUID v4
///
/// Booth ledger outcomes are matched to their command by this id, so a
/// client that reuses one across concurrent requests gets whichever outcome
/// arrives first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| header_correlation_id(&parts.headers))
            .unwrap_or_else(Uuid::new_v4);
        Ok(Self(id))
    }
}
