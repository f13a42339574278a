//! Domain error types.
//!
//! Every variant is recoverable: the machine keeps its session state and
//! continues after reporting. Rejected pennies and change shortages are
//! defined behavior, not errors.

use crate::catalog::ProductId;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a vending operation did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VendingError {
    /// Purchase attempted with less money than the product's price.
    #[error("inserted {inserted} is less than the {price} price")]
    Underpaid {
        /// The product's unit price.
        price: Money,
        /// The amount credited when the purchase was attempted.
        inserted: Money,
    },

    /// The reserve is too low to promise change and the inserted amount
    /// does not match the price exactly.
    #[error("exact change required: inserted {inserted} for a {price} product")]
    ExactChangeRequired {
        /// The product's unit price.
        price: Money,
        /// The amount credited when the purchase was attempted.
        inserted: Money,
    },

    /// The product's inventory is exhausted.
    #[error("product {product} is sold out")]
    OutOfStock {
        /// The product that has no stock.
        product: ProductId,
    },

    /// A sale was recorded against a product with zero inventory.
    #[error("no stock left to sell")]
    InsufficientStock,

    /// No product with the given id exists in the catalog.
    #[error("unknown product {product}")]
    UnknownProduct {
        /// The id that matched nothing.
        product: ProductId,
    },
}
