//! # Vending Core
//!
//! Core traits and types for the vending machine architecture.
//!
//! The machine is a reducer-driven state machine: every input becomes an
//! action, a pure reducer folds the action into state, and anything that
//! must happen outside the state (here, timers) is returned as an effect
//! value for the runtime to execute.
//!
//! ## Vocabulary
//!
//! - **State**: what the machine remembers between actions
//! - **Action**: one input, either a command from outside or an event fed
//!   back by an effect
//! - **Reducer**: the pure `(state, action, environment) -> effects` fold
//! - **Effect**: a description of deferred work, never the work itself
//! - **Environment**: dependencies (the clock) injected behind traits
//!
//! Keeping I/O out of the reducer is what makes a coin-to-purchase flow
//! testable as plain function calls.
//!
//! ## Example
//!
//! ```ignore
//! use vending_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Debug)]
//! struct SessionState {
//!     inserted_cents: u64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum SessionAction {
//!     CoinAccepted { cents: u64 },
//!     DisplayTimerElapsed,
//! }
//!
//! impl Reducer for SessionReducer {
//!     type State = SessionState;
//!     type Action = SessionAction;
//!     type Environment = SessionEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut SessionState,
//!         action: SessionAction,
//!         env: &SessionEnvironment,
//!     ) -> SmallVec<[Effect<SessionAction>; 4]> {
//!         match action {
//!             SessionAction::CoinAccepted { cents } => {
//!                 state.inserted_cents += cents;
//!                 smallvec![Effect::None]
//!             }
//!             SessionAction::DisplayTimerElapsed => smallvec![Effect::None],
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Declarative macros for ergonomic effect construction
pub mod effect_macros;

/// The reducer trait, home of all business logic
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// A pure fold from one action to state changes plus effects.
    ///
    /// Implementations mutate `state` in place and hand back descriptions
    /// of any deferred work. They must not perform I/O: given the same
    /// state, action, and environment, the outcome is always the same.
    /// See the crate-level example for a full implementation.
    pub trait Reducer {
        /// What the reducer folds actions into
        type State;

        /// The input alphabet: commands plus fed-back events
        type Action;

        /// Injected dependencies, trait objects where mocking is needed
        type Environment;

        /// Fold `action` into `state`, returning deferred work.
        ///
        /// A handler rarely returns more than a couple of effects, so the
        /// list is inline up to four entries.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect values: deferred work as data
///
/// A reducer never sleeps or spawns; it returns one of these and the
/// store runtime does the sleeping and spawning.
pub mod effect {
    use std::time::Duration;

    /// Identifier for a cancellable in-flight effect
    ///
    /// The runtime keeps a registry of live tasks keyed by `EffectId`.
    /// Registering a new [`Effect::Cancellable`] under an id that already has
    /// a live task aborts the previous task first, so at most one task is
    /// ever pending per id.
    ///
    /// Ids are chosen by the feature; a feature with one timer typically
    /// declares a single `const` id for it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EffectId(u64);

    impl EffectId {
        /// Create an effect id from a stable key
        #[must_use]
        pub const fn new(id: u64) -> Self {
            Self(id)
        }
    }

    /// One piece of deferred work, returned by a reducer and executed by
    /// the store runtime.
    ///
    /// The type parameter is the action type the work can feed back into
    /// the store once it completes.
    #[derive(Debug)]
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Dispatch `action` after `duration` has elapsed
        Delay {
            /// Sleep this long first
            duration: Duration,
            /// Then feed this back into the store
            action: Box<Action>,
        },

        /// An effect registered under an id so it can be aborted later
        ///
        /// Scheduling a new `Cancellable` under a live id replaces (aborts)
        /// the previous task for that id.
        Cancellable {
            /// Registry key for the in-flight task
            id: EffectId,
            /// The effect to run under that key
            effect: Box<Effect<Action>>,
        },

        /// Abort the in-flight effect registered under the id, if any
        ///
        /// A no-op when nothing is registered or the task already finished.
        Cancel(EffectId),
    }

    impl<Action> Effect<Action> {
        /// Wrap an effect so a later operation can abort it via [`Effect::Cancel`]
        #[must_use]
        pub fn cancellable(id: EffectId, effect: Effect<Action>) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(effect),
            }
        }

        /// Check whether this is the no-op effect
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Dependency traits for reducer environments
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the current time.
    ///
    /// Production environments hold a [`SystemClock`]; tests substitute a
    /// frozen implementation so time-stamped output is reproducible.
    pub trait Clock: Send + Sync {
        /// The current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
