//! Booth Booking Server
//!
//! Main server process that runs the booth booking API.
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Connects storage and hydrates the booth ledger
//! - Seeds the administrator account when `ADMIN_EMAIL` is set
//! - Serves HTTP until Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! # In-memory storage, no database needed
//! STORAGE_BACKEND=memory cargo run --bin server
//!
//! # PostgreSQL
//! DATABASE_URL=postgres://localhost/boothbook cargo run --bin server
//! ```

use booth_booking::{BoothBookingApp, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,booth_booking=debug,sqlx=warn,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🏷️ Starting Booth Booking Server...");

    let config = Config::from_env();
    tracing::info!(
        address = %config.bind_address(),
        storage = ?config.storage.backend,
        "Configuration loaded"
    );

    let app = BoothBookingApp::new(config).await?;
    tracing::info!("✓ Application initialized");
    tracing::info!("Press Ctrl+C to shutdown");

    app.serve().await?;
    Ok(())
}
