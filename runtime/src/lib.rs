//! # Vending Runtime
//!
//! The store runtime that drives a reducer: it serializes actions through
//! the reducer, executes the returned effects on background tasks, and
//! feeds effect-produced actions back in.
//!
//! Three pieces matter to callers:
//!
//! - **Store**: owns the state and the reducer, entry point for actions
//! - **EffectHandle**: returned by `send`, lets a caller wait until the
//!   effects of that one action have settled
//! - **Action broadcast**: every effect-produced action is re-published to
//!   subscribers once the reducer has processed it
//!
//! ## Example
//!
//! ```ignore
//! use vending_runtime::Store;
//!
//! let store = Store::new(
//!     initial_state,
//!     my_reducer,
//!     environment,
//! );
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::AbortHandle;
use vending_core::effect::{Effect, EffectId};
use vending_core::reducer::Reducer;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// What can go wrong while driving a store
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// The store no longer accepts actions.
        ///
        /// `send()` returns this once shutdown has been initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown gave up waiting.
        ///
        /// Carries how many effects were still running when the shutdown
        /// timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// `send_and_wait_for` ran out of time.
        ///
        /// No action matching the predicate arrived within the window.
        #[error("Timeout waiting for action")]
        Timeout,

        /// The action broadcast channel is gone.
        ///
        /// Happens when the last sender is dropped, normally during
        /// shutdown.
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

/// Completion handle for one action's effects
///
/// [`Store::send()`] returns one of these; waiting on it blocks until every
/// effect spawned for that action has finished. An aborted cancellable
/// effect counts as finished.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // All effects from Action::Start are now complete
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Build a handle plus the tracking half the store threads through
    /// effect execution.
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (notifier, completion) = watch::channel(());

        let tracking = EffectTracking {
            counter: Arc::clone(&counter),
            notifier,
        };

        let handle = Self {
            effects: counter,
            completion,
        };

        (handle, tracking)
    }

    /// A handle with nothing to wait for.
    ///
    /// Handy as the seed value when a loop folds over `send` results.
    #[must_use]
    pub fn completed() -> Self {
        let (_notifier, completion) = watch::channel(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion,
        }
    }

    /// Block until the effect counter reaches zero.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            let _ = self.completion.changed().await;
        }
    }

    /// Like [`wait`](Self::wait), but bounded.
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if effects are still running when `timeout`
    /// expires.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: the counting half of an [`EffectHandle`]
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// An effect started.
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// An effect finished; wake waiters when this was the last one.
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: decrements the per-action effect counter on drop
///
/// Lives inside each effect task so the counter settles even when the task
/// is aborted mid-sleep.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Internal: decrements the store-wide pending counter on drop
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        AbortHandle, Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration,
        Effect, EffectHandle, EffectId, EffectTracking, HashMap, Mutex, Ordering, Reducer,
        StoreError,
    };
    use tokio::sync::{broadcast, RwLock};

    /// Runtime coordinator around one reducer.
    ///
    /// The store owns the state behind an async `RwLock`, runs the reducer
    /// under the write lock so actions serialize, and spawns a task per
    /// delayed effect. Cancellable effects additionally park their abort
    /// handles in a registry keyed by [`EffectId`].
    ///
    /// Cloning a store is cheap and every clone drives the same state;
    /// effect tasks hold a clone so they can feed actions back in.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Store::new(
    ///     VendingState::default(),
    ///     VendingReducer,
    ///     production_environment(),
    /// );
    ///
    /// store.send(VendingAction::InsertCoin { coin: Coin::Quarter }).await?;
    /// ```
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Abort handles for in-flight cancellable effects.
        ///
        /// Registering under a live id aborts the previous task first, so at
        /// most one task is pending per id. Entries for finished tasks may
        /// linger; aborting a finished task is a no-op.
        cancellations: Arc<Mutex<HashMap<EffectId, AbortHandle>>>,
        /// Action broadcast channel for observing actions produced by effects.
        ///
        /// All actions produced by effects (e.g., a fired display timer) are
        /// broadcast to observers after the reducer has processed them. This
        /// enables request-response waiting and display-sink forwarding.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// A store over `initial_state`, with room for 16 buffered broadcast
        /// actions.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
        }

        /// Like [`new`](Self::new) with an explicit broadcast capacity.
        ///
        /// Raise the capacity when observers may fall behind bursts of
        /// effect-produced actions; a lagged observer skips ahead and sees
        /// `RecvError::Lagged`.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                cancellations: Arc::new(Mutex::new(HashMap::new())),
                action_broadcast,
            }
        }

        /// Stop accepting actions and drain in-flight effects.
        ///
        /// The shutdown flag flips first, so concurrent `send` calls fail
        /// fast with [`StoreError::ShutdownInProgress`]; then the pending
        /// counter is polled until it reaches zero or `timeout` passes.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] when effects are still
        /// running at the deadline.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Beginning graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(100);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("Shutdown complete, no effects in flight");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Gave up on shutdown with {} effects in flight",
                        pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Shutdown draining effects"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Run one action through the reducer.
        ///
        /// The reducer runs under the state write lock, so concurrent sends
        /// serialize and each one sees the previous one's state. Returned
        /// effects start on background tasks before `send` returns; the
        /// returned [`EffectHandle`] waits for those tasks, not for any
        /// actions they feed back.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] once shutdown has
        /// started.
        ///
        /// # Example
        ///
        /// ```ignore
        /// let mut handle = store.send(VendingAction::ReturnCoins).await?;
        /// handle.wait().await;
        /// ```
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
            A: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.actions.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let effects = self.reducer.reduce(&mut state, action, &self.environment);

                tracing::trace!("Reducer returned {} effects", effects.len());

                // Effect counts are tiny; f64 represents them exactly
                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!("store.effects.count").record(effects.len() as f64);

                effects
            };

            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone());
            }

            Ok(handle)
        }

        /// Send an action, then wait for a matching action to come back.
        ///
        /// For request-response flows over the feedback loop: subscribe to
        /// the broadcast, send `action`, and return the first broadcast
        /// action the predicate accepts. Only effect-produced actions are
        /// broadcast; the initial `action` itself never matches.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`] when nothing matches within `timeout`
        /// - [`StoreError::ChannelClosed`] when the broadcast shuts down
        /// - [`StoreError::ShutdownInProgress`] from the inner send
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            A: Clone,
            F: Fn(&A) -> bool,
        {
            // Subscribing first closes the gap where a fast effect could
            // broadcast before we listen.
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {}, // Not the one, keep listening
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Keep waiting; if the terminal action was among
                            // the dropped ones the timeout reports it.
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Observe every action the effects feed back into the store.
        ///
        /// Each receiver gets its own clone of each effect-produced action,
        /// delivered after the reducer has processed it, so state reads from
        /// the observer see the post-action state. Actions passed to `send`
        /// directly are not re-published.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read state through a closure, holding the read lock only for the
        /// closure's duration.
        ///
        /// ```ignore
        /// let inserted = store.state(|s| s.inserted).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Park an abort handle under `id`, aborting whatever was there.
        fn register_cancellable(&self, id: EffectId, handle: AbortHandle) {
            let previous = {
                let mut registry = self
                    .cancellations
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                registry.insert(id, handle)
            };

            if let Some(previous) = previous {
                previous.abort();
                metrics::counter!("store.effects.cancelled", "reason" => "replaced").increment(1);
                tracing::debug!(effect_id = ?id, "Replaced in-flight cancellable effect");
            }
        }

        /// Abort the in-flight effect registered under the id, if any.
        fn cancel_effect(&self, id: EffectId) {
            let handle = {
                let mut registry = self
                    .cancellations
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                registry.remove(&id)
            };

            if let Some(handle) = handle {
                handle.abort();
                metrics::counter!("store.effects.cancelled", "reason" => "requested").increment(1);
                tracing::debug!(effect_id = ?id, "Cancelled in-flight effect");
            } else {
                tracing::trace!(effect_id = ?id, "Cancel requested with nothing in flight");
            }
        }

        /// Dispatch one effect value.
        ///
        /// Delays are spawned with a [`DecrementGuard`] inside the task, so
        /// the handle's counter settles whether the task finishes or is
        /// aborted. Cancellable delays also register their abort handle;
        /// a cancellable wrapping anything else runs unregistered, since
        /// only a sleeping task holds anything worth aborting.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into tasks
        #[tracing::instrument(skip(self, effect, tracking), name = "execute_effect")]
        fn execute_effect_internal(&self, effect: Effect<A>, tracking: EffectTracking)
        where
            R: Clone,
            E: Clone,
            A: Clone + Send + 'static,
        {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);

                    self.spawn_delay(duration, *action, tracking);
                },
                Effect::Cancellable { id, effect } => match *effect {
                    Effect::Delay { duration, action } => {
                        tracing::trace!(
                            effect_id = ?id,
                            "Executing Effect::Cancellable (delay: {:?})",
                            duration
                        );
                        metrics::counter!("store.effects.executed", "type" => "cancellable")
                            .increment(1);

                        let task = self.spawn_delay(duration, *action, tracking);
                        self.register_cancellable(id, task);
                    },
                    inner => {
                        tracing::warn!(
                            effect_id = ?id,
                            "Cancellable wraps a non-delay effect, executing unregistered"
                        );
                        self.execute_effect_internal(inner, tracking);
                    },
                },
                Effect::Cancel(id) => {
                    tracing::trace!(effect_id = ?id, "Executing Effect::Cancel");
                    metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);

                    self.cancel_effect(id);
                },
            }
        }

        /// Spawn the timer task for a delayed action.
        ///
        /// Both counters move before the spawn, so a shutdown or a waiting
        /// handle can never miss the task. After the sleep the action goes
        /// through the reducer first and is broadcast second; observers
        /// always read post-reduction state.
        fn spawn_delay(&self, duration: Duration, action: A, tracking: EffectTracking) -> AbortHandle
        where
            R: Clone,
            E: Clone,
        {
            tracking.increment();

            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            let store = self.clone();

            let task = tokio::spawn(async move {
                let _guard = DecrementGuard(tracking);
                let _pending_guard = pending_guard;

                tokio::time::sleep(duration).await;
                tracing::trace!("Delay elapsed, feeding action back");

                let _ = store.send(action.clone()).await;

                let _ = store.action_broadcast.send(action);
            });

            task.abort_handle()
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                cancellations: Arc::clone(&self.cancellations),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

pub use error::StoreError;
pub use store::Store;
