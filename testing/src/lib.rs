//! # Boothbook Testing
//!
//! Helpers for reducer tests:
//!
//! - [`FixedClock`] / [`test_clock`] pin time so timestamps can be asserted
//! - [`ReducerTest`] reduces a list of actions against a given state and
//!   checks the result
//! - [`resolve_effects`] runs returned effects without a store and hands
//!   back the actions they produced

mod clock;

pub use clock::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions, resolve_effects};
