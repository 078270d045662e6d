//! Application state for the booth booking HTTP server.
//!
//! Contains everything handlers need:
//! - Repositories (events, users, payments)
//! - The booth ledger service (booths and bookings)
//! - Token keys (for bearer authentication)
//! - The payment gateway

use crate::app::LedgerService;
use crate::auth::TokenKeys;
use crate::config::Config;
use crate::payment_gateway::PaymentGateway;
use crate::storage::Repositories;
use axum::extract::FromRef;
use boothbook_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply, every field is reference counted) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<Config>,

    /// Document repositories
    pub repositories: Repositories,

    /// Booth ledger: every booth and booking write goes through it
    pub ledger: LedgerService,

    /// Bearer token signing and verification
    pub tokens: Arc<TokenKeys>,

    /// Payment processor
    pub gateway: Arc<dyn PaymentGateway>,

    /// Time source for timestamps written by handlers
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create a new application state using the system clock.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        repositories: Repositories,
        ledger: LedgerService,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let tokens = Arc::new(TokenKeys::from_config(&config.auth));
        Self {
            config,
            repositories,
            ledger,
            tokens,
            gateway,
            clock: Arc::new(SystemClock),
        }
    }
}

// Lets the auth extractors pull the token keys out of AppState
impl FromRef<AppState> for Arc<TokenKeys> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.tokens)
    }
}
