//! Ledger service - the handlers' door into the booth ledger store.
//!
//! Handlers never touch the store directly. Commands go through
//! [`LedgerService::dispatch`], which sends the command, waits for the
//! outcome carrying the same correlation id, and maps it to either the
//! persisted [`LedgerChange`] or an [`AppError`]. Reads go through
//! [`LedgerService::read`], which runs a closure against current state.

use crate::aggregates::{LedgerAction, LedgerState, LedgerStore, Rejection};
use crate::storage::LedgerChange;
use crate::types::Booth;
use boothbook_runtime::{HealthCheck, StoreError};
use boothbook_web::{AppError, WebResult};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        let message = rejection.to_string();
        match rejection {
            Rejection::NotFound(resource) => Self::not_found(resource),
            Rejection::AlreadyBooked | Rejection::Unavailable(_) | Rejection::Invalid(_) => {
                Self::bad_request(message)
            },
            Rejection::Forbidden(_) => Self::forbidden(message),
            Rejection::Conflict(_) | Rejection::Busy => Self::conflict(message),
        }
    }
}

/// Sends commands to the booth ledger and reads its state
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<LedgerStore>,
    timeout: Duration,
}

impl LedgerService {
    /// Wrap a running ledger store
    #[must_use]
    pub const fn new(store: Arc<LedgerStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    /// Run a closure against current ledger state
    pub async fn read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&LedgerState) -> T,
    {
        self.store.state(f).await
    }

    /// A booth by document key or booth number
    ///
    /// # Errors
    ///
    /// Returns 404 "Booth not found" if neither matches.
    pub async fn find_booth(&self, key: &str) -> WebResult<Booth> {
        self.read(|state| state.find_booth(key).cloned())
            .await
            .ok_or_else(|| AppError::not_found("Booth"))
    }

    /// Send a command and wait for its outcome
    ///
    /// The command is re-keyed with a fresh id before it is sent; the
    /// request's correlation id is only recorded on the span. Clients
    /// choose their correlation ids, so two requests may share one.
    ///
    /// # Errors
    ///
    /// - the command's [`Rejection`], mapped to its HTTP status
    /// - 500 if storage refused the change
    /// - 503 if the ledger does not answer in time or is shutting down
    #[tracing::instrument(
        skip(self, action),
        fields(correlation_id = %action.correlation_id(), command_id = tracing::field::Empty)
    )]
    pub async fn dispatch(&self, action: LedgerAction) -> WebResult<LedgerChange> {
        let command_id = Uuid::new_v4();
        tracing::Span::current().record("command_id", tracing::field::display(command_id));
        let action = action.keyed(command_id);

        let outcome = self
            .store
            .send_and_wait_for(
                action,
                move |candidate| {
                    candidate.is_outcome() && candidate.correlation_id() == command_id
                },
                self.timeout,
            )
            .await
            .inspect_err(|error| {
                if matches!(error, StoreError::Timeout) {
                    metrics::counter!("ledger.commands.timed_out").increment(1);
                }
            })?;

        match outcome {
            LedgerAction::CommandRejected { rejection, .. } => Err(rejection.into()),
            LedgerAction::PersistenceFailed { error, .. } => {
                Err(AppError::internal("Failed to save changes")
                    .with_source(anyhow::anyhow!(error)))
            },
            other => other
                .change()
                .cloned()
                .ok_or_else(|| AppError::internal("Unexpected ledger outcome")),
        }
    }

    /// Store health for the readiness check
    #[must_use]
    pub fn health(&self) -> HealthCheck {
        self.store.health()
    }

    /// Drain in-flight persistence effects
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}
