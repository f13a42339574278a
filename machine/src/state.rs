//! Machine session state and the display state machine.

use crate::catalog::{Product, ProductId};
use crate::error::VendingError;
use crate::money::{Money, MoneyCollection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the front panel is currently showing.
///
/// `SoldOut`, `PriceShown`, and `ThankYou` are transient: each schedules a
/// deferred revert back to an idle prompt (or the running total) after a
/// configured delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayState {
    /// Waiting for coins.
    Idle,
    /// Waiting for coins, but the reserve is too low to promise change.
    ExactChangeOnly,
    /// Echoes the running inserted total.
    AmountShown(Money),
    /// Echoes a product's price after an underpaid purchase attempt.
    PriceShown(Money),
    /// The requested product has no stock.
    SoldOut,
    /// Purchase completed.
    ThankYou,
}

impl DisplayState {
    /// Whether this state schedules its own deferred revert.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::SoldOut | Self::PriceShown(_) | Self::ThankYou)
    }
}

/// Complete session state of the vending machine.
///
/// Owned exclusively by the store; all mutation flows through the reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendingState {
    /// Money credited to the current customer.
    pub inserted: Money,

    /// What the front panel shows.
    pub display: DisplayState,

    /// Coins the machine can dispense as change.
    pub reserve: MoneyCollection,

    /// Coins waiting in the customer-facing return tray.
    pub tray: MoneyCollection,

    /// Products on offer, keyed by stable id.
    pub products: HashMap<ProductId, Product>,

    /// Outcome of the most recent command (`None` on success).
    pub last_error: Option<VendingError>,
}

impl VendingState {
    /// Reserve total below which the machine demands exact payment.
    pub const EXACT_CHANGE_THRESHOLD: Money = Money::from_cents(100);

    /// Creates the starting state for a machine.
    ///
    /// The initial display is derived from the reserve: a machine that
    /// cannot promise change starts in `EXACT CHANGE ONLY`.
    #[must_use]
    #[allow(clippy::implicit_hasher)] // Catalogs are built once with the default hasher
    pub fn new(reserve: MoneyCollection, products: HashMap<ProductId, Product>) -> Self {
        let mut state = Self {
            inserted: Money::ZERO,
            display: DisplayState::Idle,
            reserve,
            tray: MoneyCollection::default(),
            products,
            last_error: None,
        };
        state.display = state.idle_display();
        state
    }

    /// True when the reserve cannot guarantee change-making.
    ///
    /// Derived on demand from the reserve total, so it can never go stale.
    #[must_use]
    pub fn exact_change_only(&self) -> bool {
        self.reserve.total() < Self::EXACT_CHANGE_THRESHOLD
    }

    /// The idle prompt for the current reserve level.
    #[must_use]
    pub fn idle_display(&self) -> DisplayState {
        if self.exact_change_only() {
            DisplayState::ExactChangeOnly
        } else {
            DisplayState::Idle
        }
    }

    /// Where a transient display falls back to when its timer fires.
    #[must_use]
    pub fn revert_display(&self) -> DisplayState {
        if self.inserted.is_zero() {
            self.idle_display()
        } else {
            DisplayState::AmountShown(self.inserted)
        }
    }
}

impl Default for VendingState {
    fn default() -> Self {
        Self::new(MoneyCollection::default(), HashMap::new())
    }
}
