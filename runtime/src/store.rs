//! The store: state, reducer and effect execution behind one handle

use crate::{HealthCheck, StoreError};
use boothbook_core::{effect::Effect, reducer::Reducer};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, broadcast};

const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Backlog above which the store reports itself degraded
const DEGRADED_PENDING_EFFECTS: usize = 1_000;

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Inner<S, A, E, R> {
    state: RwLock<S>,
    reducer: R,
    environment: E,
    shutting_down: AtomicBool,
    pending_effects: AtomicUsize,
    /// Effect-produced actions, published after they were reduced
    outcomes: broadcast::Sender<A>,
}

/// Owns a reducer's state and runs its effects.
///
/// Cloning is cheap; clones share the same state.
pub struct Store<S, A, E, R> {
    inner: Arc<Inner<S, A, E, R>>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Decrements the pending-effect count when an effect task ends, panicked
/// or not.
struct PendingEffect<S, A, E, R>(Store<S, A, E, R>);

impl<S, A, E, R> Drop for PendingEffect<S, A, E, R> {
    fn drop(&mut self) {
        self.0.inner.pending_effects.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Clone + Send + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// A store whose outcome broadcast buffers 16 actions
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, DEFAULT_BROADCAST_CAPACITY)
    }

    /// A store with a custom outcome buffer.
    ///
    /// Every waiting request holds a receiver; a receiver that falls more
    /// than `capacity` outcomes behind skips the oldest ones.
    #[must_use]
    pub fn with_broadcast_capacity(initial_state: S, reducer: R, environment: E, capacity: usize) -> Self {
        let (outcomes, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(initial_state),
                reducer,
                environment,
                shutting_down: AtomicBool::new(false),
                pending_effects: AtomicUsize::new(0),
                outcomes,
            }),
        }
    }

    /// Effects currently running
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.inner.pending_effects.load(Ordering::Acquire)
    }

    fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    /// Readiness of this store.
    ///
    /// Unhealthy once shutdown has begun; degraded while the effect backlog
    /// is unusually deep.
    #[must_use]
    pub fn health(&self) -> HealthCheck {
        let pending = self.pending_effects();
        let check = if self.is_shutting_down() {
            HealthCheck::unhealthy("store", "Store is shutting down")
        } else if pending > DEGRADED_PENDING_EFFECTS {
            HealthCheck::degraded("store", format!("{pending} effects pending"))
        } else {
            HealthCheck::healthy("store")
        };
        check
            .with_metadata("pending_effects", pending.to_string())
            .with_metadata("observers", self.inner.outcomes.receiver_count().to_string())
    }

    /// Stop accepting commands and wait for running effects to finish.
    ///
    /// Effects still in flight may feed their outcomes back while the
    /// store drains.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] with the number of effects
    /// still running when `timeout` passes.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Store shutting down");
        metrics::counter!("store.shutdown.initiated").increment(1);
        self.inner.shutting_down.store(true, Ordering::Release);

        let deadline = Instant::now() + timeout;
        loop {
            let pending = self.pending_effects();
            if pending == 0 {
                tracing::info!("Store drained");
                metrics::counter!("store.shutdown.completed").increment(1);
                return Ok(());
            }
            if Instant::now() >= deadline {
                tracing::error!(pending_effects = pending, "Store drain timed out");
                metrics::counter!("store.shutdown.timeout").increment(1);
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tracing::debug!(pending_effects = pending, "Waiting for effects");
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
    }

    /// Reduce a command and start its effects.
    ///
    /// Returns once the reducer has run; effects keep going in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown began.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.is_shutting_down() {
            tracing::warn!("Rejected action: store is shutting down");
            metrics::counter!("store.shutdown.rejected_actions").increment(1);
            return Err(StoreError::ShutdownInProgress);
        }
        metrics::counter!("store.commands.total").increment(1);
        self.reduce(action).await;
        Ok(())
    }

    /// Send a command and wait for the first outcome matching `predicate`.
    ///
    /// The receiver is subscribed before the command is reduced, so an
    /// outcome cannot slip past. Put a correlation id in the predicate to
    /// tell concurrent requests apart.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] after shutdown began
    /// - [`StoreError::Timeout`] when nothing matched in time
    /// - [`StoreError::ChannelClosed`] if the broadcast closed
    pub async fn send_and_wait_for<F>(&self, action: A, predicate: F, timeout: Duration) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut outcomes = self.inner.outcomes.subscribe();
        self.send(action).await?;

        let wait = async {
            loop {
                match outcomes.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Outcome observer lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => return Err(StoreError::ChannelClosed),
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    /// Read state through a closure
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.inner.state.read().await;
        f(&*state)
    }

    async fn reduce(&self, action: A) {
        let effects = {
            let mut state = self.inner.state.write().await;
            let started = Instant::now();
            let effects = self
                .inner
                .reducer
                .reduce(&mut *state, action, &self.inner.environment);
            metrics::histogram!("store.reducer.duration_seconds").record(started.elapsed().as_secs_f64());
            effects
        };

        for effect in effects {
            self.run(effect);
        }
    }

    fn run(&self, effect: Effect<A>) {
        match effect {
            Effect::None => {},
            Effect::Future(future) => {
                metrics::counter!("store.effects.executed").increment(1);
                let store = self.clone();
                self.spawn_tracked(async move {
                    if let Some(action) = future.await {
                        store.feed_back(action).await;
                    }
                });
            },
        }
    }

    /// Reduce an effect's follow-up action, then publish it.
    ///
    /// Bypasses the shutdown gate: the follow-up completes work that was
    /// accepted before shutdown.
    async fn feed_back(&self, action: A) {
        self.reduce(action.clone()).await;
        // No receivers is fine; nobody was waiting
        let _ = self.inner.outcomes.send(action);
    }

    fn spawn_tracked<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.pending_effects.fetch_add(1, Ordering::AcqRel);
        let guard = PendingEffect(self.clone());
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use boothbook_core::{SmallVec, async_effect, smallvec};
    use tokio_test::{assert_err, assert_ok};

    /// Seats sold by a box office; sales are confirmed by an effect
    #[derive(Debug, Default)]
    struct BoxOffice {
        sold: u32,
        confirmed: Vec<u32>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Ticket {
        Sell { order: u32 },
        Confirmed { order: u32 },
        SellSlowly { order: u32, delay_ms: u64 },
        Explode,
    }

    struct BoxOfficeReducer;

    impl Reducer for BoxOfficeReducer {
        type State = BoxOffice;
        type Action = Ticket;
        type Environment = ();

        fn reduce(&self, office: &mut BoxOffice, action: Ticket, _env: &()) -> SmallVec<[Effect<Ticket>; 4]> {
            match action {
                Ticket::Sell { order } => {
                    office.sold += 1;
                    smallvec![async_effect! { Some(Ticket::Confirmed { order }) }]
                },
                Ticket::SellSlowly { order, delay_ms } => {
                    office.sold += 1;
                    smallvec![async_effect! {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        Some(Ticket::Confirmed { order })
                    }]
                },
                Ticket::Confirmed { order } => {
                    office.confirmed.push(order);
                    smallvec![Effect::None]
                },
                Ticket::Explode => smallvec![async_effect! {
                    panic!("effect failed");
                }],
            }
        }
    }

    type OfficeStore = Store<BoxOffice, Ticket, (), BoxOfficeReducer>;

    fn store() -> OfficeStore {
        Store::new(BoxOffice::default(), BoxOfficeReducer, ())
    }

    fn confirmed(order: u32) -> impl Fn(&Ticket) -> bool {
        move |action| *action == Ticket::Confirmed { order }
    }

    #[tokio::test]
    async fn waits_for_its_own_outcome() {
        let store = store();
        let slow = store.clone();
        let other = tokio::spawn(async move {
            slow.send_and_wait_for(
                Ticket::SellSlowly { order: 1, delay_ms: 50 },
                confirmed(1),
                Duration::from_secs(1),
            )
            .await
        });

        let outcome = store
            .send_and_wait_for(Ticket::Sell { order: 2 }, confirmed(2), Duration::from_secs(1))
            .await;
        assert_eq!(assert_ok!(outcome), Ticket::Confirmed { order: 2 });
        assert_ok!(other.await.unwrap());
        assert_eq!(store.state(|office| office.sold).await, 2);
    }

    #[tokio::test]
    async fn outcome_is_reduced_before_it_is_published() {
        let store = store();
        store
            .send_and_wait_for(Ticket::Sell { order: 7 }, confirmed(7), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(store.state(|office| office.confirmed.clone()).await, vec![7]);
    }

    #[tokio::test]
    async fn unmatched_wait_times_out() {
        let store = store();
        let result = store
            .send_and_wait_for(
                Ticket::SellSlowly { order: 1, delay_ms: 500 },
                confirmed(1),
                Duration::from_millis(20),
            )
            .await;
        assert_eq!(assert_err!(result), StoreError::Timeout);
    }

    #[tokio::test]
    async fn panicking_effect_is_released() {
        let store = store();
        store.send(Ticket::Explode).await.unwrap();
        assert_ok!(store.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn shutdown_drains_and_rejects() {
        let store = store();
        store
            .send(Ticket::SellSlowly { order: 3, delay_ms: 30 })
            .await
            .unwrap();
        assert_eq!(store.pending_effects(), 1);

        assert_ok!(store.shutdown(Duration::from_secs(1)).await);
        // The in-flight sale still landed
        assert_eq!(store.state(|office| office.confirmed.clone()).await, vec![3]);
        assert_eq!(assert_err!(store.send(Ticket::Sell { order: 4 }).await), StoreError::ShutdownInProgress);
        assert!(store.health().status.is_unhealthy());
    }

    #[tokio::test]
    async fn shutdown_gives_up_after_timeout() {
        let store = store();
        store
            .send(Ticket::SellSlowly { order: 1, delay_ms: 1_000 })
            .await
            .unwrap();
        assert_eq!(store.shutdown(Duration::from_millis(10)).await, Err(StoreError::ShutdownTimeout(1)));
    }

    #[tokio::test]
    async fn idle_store_is_healthy() {
        let check = store().health();
        assert!(check.status.is_healthy());
        assert!(check.metadata.contains(&("pending_effects".to_string(), "0".to_string())));
    }
}
