//! # Boothbook Runtime
//!
//! Runs a [`Reducer`](boothbook_core::Reducer) behind a [`Store`]:
//!
//! - one write lock serialises every reducer call, so each action is
//!   validated against the outcome of all earlier ones
//! - effects run on spawned tasks and their follow-up actions are reduced
//!   before anyone is told about them
//! - request handlers wait for "their" outcome with
//!   [`Store::send_and_wait_for`]
//!
//! ```ignore
//! let store = Store::new(state, reducer, environment);
//! let outcome = store
//!     .send_and_wait_for(command, |a| a.correlation_id() == id, Duration::from_secs(5))
//!     .await?;
//! let booths = store.state(|s| s.booth_count()).await;
//! ```

mod error;
mod health;
mod store;

pub use error::StoreError;
pub use health::{HealthCheck, HealthReport, HealthStatus};
pub use store::Store;
