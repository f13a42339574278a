//! # Vending Testing
//!
//! Test support for the vending machine workspace: a deterministic clock
//! for environments, a given/when/then builder for reducer cases, and
//! assertion helpers for effect slices.
//!
//! ## Example
//!
//! ```ignore
//! use vending_testing::{test_clock, ReducerTest};
//!
//! #[test]
//! fn quarter_increments_balance() {
//!     ReducerTest::new(VendingReducer)
//!         .with_env(test_environment())
//!         .given_state(VendingState::default())
//!         .when_action(VendingAction::InsertCoin { coin: Coin::Quarter })
//!         .then_state(|state| {
//!             assert_eq!(state.inserted, Money::from_cents(25));
//!         })
//!         .run();
//! }
//! ```

use chrono::{DateTime, Utc};
use vending_core::environment::Clock;


/// Deterministic stand-ins for Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// A clock frozen at one instant.
    ///
    /// Diagnostics output embeds the current time, so tests pin it.
    ///
    /// # Example
    ///
    /// ```
    /// use vending_testing::mocks::FixedClock;
    /// use vending_core::environment::Clock;
    /// use chrono::DateTime;
    ///
    /// let time = DateTime::from_timestamp(1_735_689_600, 0).unwrap();
    /// let clock = FixedClock::new(time);
    /// assert_eq!(clock.now(), time);
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Freeze the clock at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Unix seconds for 2025-01-01 00:00:00 UTC, the instant tests run at.
    const TEST_EPOCH_SECS: i64 = 1_735_689_600;

    /// A [`FixedClock`] frozen at 2025-01-01 00:00:00 UTC.
    ///
    /// # Panics
    ///
    /// Never in practice; the epoch constant is in range for chrono.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        let time = DateTime::from_timestamp(TEST_EPOCH_SECS, 0).expect("test epoch is in range");
        FixedClock::new(time)
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock};
pub use reducer_test::{assertions, ReducerTest};
