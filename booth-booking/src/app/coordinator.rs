//! Application coordinator - main application lifecycle manager.
//!
//! Boot order:
//! 1. Storage (`PostgreSQL` with schema bootstrap, or memory)
//! 2. Booth ledger hydrated from stored booths and bookings
//! 3. Seeded administrator, when configured
//! 4. HTTP server with graceful shutdown, then the ledger drains

use super::services::LedgerService;
use crate::aggregates::{LedgerEnvironment, LedgerReducer, LedgerState, LedgerStore};
use crate::auth::{hash_in_pool, PasswordError};
use crate::config::{Config, StorageBackend};
use crate::payment_gateway::SimulatedGateway;
use crate::server::{build_router, AppState};
use crate::storage::{
    normalize_email, InMemoryStorage, PostgresStorage, Repositories, StorageError,
};
use crate::types::{User, UserId, UserRole, UserStatus};
use axum::Router;
use boothbook_core::environment::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Boot and serve errors
#[derive(Error, Debug)]
pub enum BootError {
    /// Storage could not be reached or prepared
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The seeded administrator's password could not be hashed
    #[error("Admin seeding failed: {0}")]
    Seed(#[from] PasswordError),

    /// Binding or serving failed
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// The booth booking application: storage, ledger and HTTP state.
pub struct BoothBookingApp {
    state: AppState,
}

impl BoothBookingApp {
    /// Connect storage per configuration and assemble the application.
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable, the schema cannot be
    /// created, or the ledger cannot be loaded.
    pub async fn new(config: Config) -> Result<Self, BootError> {
        let repositories = match config.storage.backend {
            StorageBackend::Postgres => {
                info!(
                    max_connections = config.storage.max_connections,
                    "Connecting to PostgreSQL"
                );
                let storage = PostgresStorage::connect(&config.storage).await?;
                storage.ensure_schema().await?;
                info!("✓ Database schema ready");
                Repositories::postgres(Arc::new(storage))
            },
            StorageBackend::Memory => {
                warn!("Using in-memory storage; data is lost on restart");
                Repositories::in_memory(Arc::new(InMemoryStorage::new()))
            },
        };

        Self::with_repositories(config, repositories).await
    }

    /// Assemble the application over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be loaded or the admin seeded.
    pub async fn in_memory(config: Config, storage: Arc<InMemoryStorage>) -> Result<Self, BootError> {
        Self::with_repositories(config, Repositories::in_memory(storage)).await
    }

    /// Assemble the application over the given repositories.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be loaded or the admin seeded.
    pub async fn with_repositories(
        config: Config,
        repositories: Repositories,
    ) -> Result<Self, BootError> {
        let snapshot = repositories.ledger.load().await?;
        info!(
            booths = snapshot.booths.len(),
            bookings = snapshot.bookings.len(),
            "Booth ledger loaded"
        );

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let environment = LedgerEnvironment::new(Arc::clone(&clock), Arc::clone(&repositories.ledger));
        let store: Arc<LedgerStore> = Arc::new(LedgerStore::with_broadcast_capacity(
            LedgerState::from_snapshot(snapshot),
            LedgerReducer::new(),
            environment,
            config.ledger.broadcast_capacity,
        ));
        let ledger = LedgerService::new(store, config.ledger_timeout());

        let gateway =
            SimulatedGateway::shared(Duration::from_millis(config.payments.processing_delay_ms));
        let state = AppState::new(Arc::new(config), repositories, ledger, gateway);

        let app = Self { state };
        app.seed_admin().await?;
        Ok(app)
    }

    /// Shared handler state
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// The HTTP router over this application's state
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Create the configured administrator account if it does not exist.
    ///
    /// An existing account with that email is left untouched.
    async fn seed_admin(&self) -> Result<(), BootError> {
        let auth = &self.state.config.auth;
        let (Some(email), Some(password)) = (auth.admin_email.as_deref(), auth.admin_password.as_deref())
        else {
            return Ok(());
        };

        let users = &self.state.repositories.users;
        if let Some(existing) = users.find_by_email(email).await? {
            if existing.role != UserRole::Admin {
                warn!(user_id = %existing.id, "Seed admin email belongs to a non-admin account");
            }
            return Ok(());
        }

        let admin = User {
            id: UserId::new(),
            first_name: "Admin".to_string(),
            last_name: String::new(),
            email: normalize_email(email),
            phone: String::new(),
            company_name: String::new(),
            industry: String::new(),
            company_size: String::new(),
            company_address: String::new(),
            password_hash: hash_in_pool(password.to_string()).await?,
            role: UserRole::Admin,
            status: UserStatus::Active,
            registration_date: self.state.clock.now(),
        };

        match users.insert(&admin).await {
            Ok(()) => {
                info!(user_id = %admin.id, "✓ Administrator account seeded");
                Ok(())
            },
            // Another instance seeded it first
            Err(StorageError::DuplicateEmail(_)) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Bind and serve until SIGINT or SIGTERM, then drain the ledger.
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound or serving fails.
    pub async fn serve(self) -> Result<(), BootError> {
        let address = self.state.config.bind_address();
        let shutdown_timeout = self.state.config.shutdown_timeout();
        let listener = TcpListener::bind(&address).await?;
        info!(%address, "HTTP server listening for requests");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped, draining booth ledger...");
        match self.state.ledger.shutdown(shutdown_timeout).await {
            Ok(()) => info!("Graceful shutdown complete"),
            Err(error) => warn!(error = %error, "Booth ledger did not drain in time"),
        }
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(error = %error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(error) => {
                warn!(error = %error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::verify_password;

    #[tokio::test]
    async fn seeds_configured_admin_once() {
        let mut config = Config::for_tests();
        config.auth.admin_email = Some("Admin@Example.com".to_string());
        config.auth.admin_password = Some("admin-password".to_string());
        let storage = Arc::new(InMemoryStorage::new());

        let app = BoothBookingApp::in_memory(config.clone(), Arc::clone(&storage))
            .await
            .unwrap();
        let admin = app
            .state()
            .repositories
            .users
            .find_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert!(verify_password("admin-password", &admin.password_hash));

        // A second boot over the same storage leaves the account alone
        let again = BoothBookingApp::in_memory(config, storage).await.unwrap();
        let users = again.state().repositories.users.list().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, admin.id);
    }

    #[tokio::test]
    async fn no_admin_without_credentials() {
        let app = BoothBookingApp::in_memory(Config::for_tests(), Arc::new(InMemoryStorage::new()))
            .await
            .unwrap();

        assert!(app.state().repositories.users.list().await.unwrap().is_empty());
        assert_eq!(app.state().ledger.read(LedgerState::booth_count).await, 0);
    }
}
