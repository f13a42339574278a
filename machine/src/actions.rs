//! Actions accepted by the vending machine reducer.
//!
//! Commands arrive from outside (customers pushing buttons, operators
//! restocking); events are produced by the machine itself, fed back through
//! effects.

use crate::catalog::ProductId;
use crate::money::{Coin, Money};
use serde::{Deserialize, Serialize};
use vending_macros::Action;

/// Everything that can happen to a vending machine.
#[derive(Action, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VendingAction {
    // ========== Customer commands ==========
    /// A coin was dropped into the slot.
    #[command]
    InsertCoin {
        /// The denomination inserted.
        coin: Coin,
    },

    /// The button for a product was pressed.
    #[command]
    Purchase {
        /// The product requested.
        product: ProductId,
    },

    /// The coin-return lever was pulled.
    #[command]
    ReturnCoins,

    /// The customer scooped everything out of the return tray.
    #[command]
    EmptyCoinReturn,

    // ========== Operator commands ==========
    /// Reprices a product.
    #[command]
    SetProductPrice {
        /// The product to reprice.
        product: ProductId,
        /// The new unit price.
        price: Money,
    },

    /// Restocks (or zeroes out) a product.
    #[command]
    SetProductInventory {
        /// The product to restock.
        product: ProductId,
        /// The new stock count.
        count: u32,
    },

    // ========== Events ==========
    /// The transient-display timer fired.
    #[event]
    DisplayTimerElapsed,
}
