//! Application coordinator - wires together all components.
//!
//! This module provides the main application structure that coordinates:
//! - Storage (`PostgreSQL` or in-memory repositories)
//! - The booth ledger store and its service
//! - The HTTP server and its graceful shutdown

mod coordinator;
mod services;

pub use coordinator::{BootError, BoothBookingApp};
pub use services::LedgerService;
