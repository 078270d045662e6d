//! # Boothbook Core
//!
//! Reducers, effects and injected environment for the booth booking
//! platform.
//!
//! A reducer owns the business rules. It receives the current state and one
//! action, mutates the state in place, and returns the I/O it wants done as
//! [`Effect`] values. It never awaits anything itself. The runtime crate runs
//! the effects and feeds the actions they produce back into the same
//! reducer, so a write and its outcome are two reducer calls:
//!
//! ```text
//!   PlaceBooking ──reduce──▶ hold booth, Effect::Future(persist)
//!                                          │
//!   BookingPlaced ◀──────── feed back ─────┘
//!         │
//!       reduce ──▶ apply booking, lift hold
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use boothbook_core::{Effect, Reducer, SmallVec, smallvec};
//!
//! struct TallyReducer;
//!
//! impl Reducer for TallyReducer {
//!     type State = u64;
//!     type Action = u64;
//!     type Environment = ();
//!
//!     fn reduce(&self, total: &mut u64, add: u64, _env: &()) -> SmallVec<[Effect<u64>; 4]> {
//!         *total += add;
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

mod effect_macros;

pub use smallvec::{SmallVec, smallvec};

pub use effect::Effect;
pub use environment::{Clock, SystemClock};
pub use reducer::Reducer;

/// The reducer trait
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Business logic for one kind of state.
    ///
    /// `reduce` must be deterministic for a given state, action and
    /// environment; anything that touches the outside world goes into a
    /// returned [`Effect`]. Most actions yield zero or one effect, so they
    /// come back in a `SmallVec` that stays inline up to four entries.
    pub trait Reducer {
        /// State owned by the store running this reducer
        type State;

        /// Commands, outcomes and failures alike
        type Action;

        /// Injected dependencies (clock, repositories)
        type Environment;

        /// Apply one action
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Side effects as values
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future an effect runs to completion
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Work a reducer asks the runtime to do.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Run an async computation; a `Some` result is fed back as the next
        /// action
        Future(EffectFuture<Action>),
    }

    impl<Action> Effect<Action> {
        /// Wrap a future producing an optional follow-up action
        #[must_use]
        pub fn future<F>(future: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Self::Future(Box::pin(future))
        }

        /// Whether running this effect does nothing
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Self::None)
        }
    }

    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => f.write_str("Effect::None"),
                Self::Future(_) => f.write_str("Effect::Future(..)"),
            }
        }
    }
}

/// Injected dependencies
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Time source.
    ///
    /// Production code uses [`SystemClock`]; tests pin time with the fixed
    /// clock from the testing crate so timestamps are predictable.
    pub trait Clock: Send + Sync {
        /// The current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adds to a running total; totals above the limit ask for an audit
    struct TallyReducer {
        limit: u64,
    }

    #[derive(Debug, PartialEq)]
    enum TallyAction {
        Add(u64),
        Audit(u64),
    }

    impl Reducer for TallyReducer {
        type State = u64;
        type Action = TallyAction;
        type Environment = ();

        fn reduce(
            &self,
            total: &mut u64,
            action: TallyAction,
            _env: &(),
        ) -> SmallVec<[Effect<TallyAction>; 4]> {
            match action {
                TallyAction::Add(amount) => {
                    *total += amount;
                    if *total > self.limit {
                        let seen = *total;
                        smallvec![Effect::future(async move { Some(TallyAction::Audit(seen)) })]
                    } else {
                        smallvec![Effect::None]
                    }
                },
                TallyAction::Audit(_) => SmallVec::new(),
            }
        }
    }

    #[test]
    fn reducer_mutates_state_in_place() {
        let mut total = 0;
        let effects = TallyReducer { limit: 10 }.reduce(&mut total, TallyAction::Add(4), &());

        assert_eq!(total, 4);
        assert!(effects.iter().all(Effect::is_none));
    }

    #[tokio::test]
    async fn future_effect_yields_follow_up() {
        let mut total = 8;
        let mut effects = TallyReducer { limit: 10 }.reduce(&mut total, TallyAction::Add(5), &());

        let Some(Effect::Future(future)) = effects.pop() else {
            unreachable!("over the limit always audits");
        };
        assert_eq!(future.await, Some(TallyAction::Audit(13)));
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
