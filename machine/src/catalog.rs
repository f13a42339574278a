//! Products and their stable identifiers.
//!
//! The catalog itself is a `HashMap<ProductId, Product>` owned by the
//! machine state; purchases and diagnostics key by identity, never by
//! position.

use crate::error::VendingError;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a product slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    /// Creates an identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A priced, stocked item in the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    name: String,
    price: Money,
    inventory: u32,
}

impl Product {
    /// Creates a product with a display name, unit price, and stock count.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Money, inventory: u32) -> Self {
        Self {
            name: name.into(),
            price,
            inventory,
        }
    }

    /// The display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit price.
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }

    /// The current stock count.
    #[must_use]
    pub const fn inventory(&self) -> u32 {
        self.inventory
    }

    /// Replaces the unit price.
    pub const fn set_price(&mut self, price: Money) {
        self.price = price;
    }

    /// Replaces the stock count.
    pub const fn set_inventory(&mut self, count: u32) {
        self.inventory = count;
    }

    /// Whether at least one item is in stock.
    #[must_use]
    pub const fn available(&self) -> bool {
        self.inventory >= 1
    }

    /// Records a sale, decrementing stock by one.
    ///
    /// Callers are expected to check [`Product::available`] first; selling
    /// at zero inventory is a contract violation reported as an error.
    ///
    /// # Errors
    ///
    /// Returns [`VendingError::InsufficientStock`] when the inventory is
    /// already zero.
    pub const fn item_sold(&mut self) -> Result<(), VendingError> {
        if self.inventory == 0 {
            return Err(VendingError::InsufficientStock);
        }
        self.inventory -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_initialization() {
        let product = Product::new("Cola", Money::from_dollars(1), 10);

        assert_eq!(product.name(), "Cola");
        assert_eq!(product.price(), Money::from_dollars(1));
        assert_eq!(product.inventory(), 10);
        assert!(product.available());
    }

    #[test]
    fn product_update() {
        let mut product = Product::new("Cola", Money::from_dollars(1), 10);

        product.set_inventory(5);
        assert_eq!(product.inventory(), 5);

        product.set_price(Money::from_cents(50));
        assert_eq!(product.price(), Money::from_cents(50));
    }

    #[test]
    fn product_inventory_decreases_when_sold() {
        let mut product = Product::new("Cola", Money::from_dollars(1), 10);

        assert!(product.item_sold().is_ok());
        assert_eq!(product.inventory(), 9);
    }

    #[test]
    fn product_sale_at_zero_inventory_is_rejected() {
        let mut product = Product::new("Cola", Money::from_dollars(1), 0);

        assert!(!product.available());
        assert_eq!(product.item_sold(), Err(VendingError::InsufficientStock));
        assert_eq!(product.inventory(), 0);
    }

    #[test]
    fn product_id_ordering_is_stable() {
        let mut ids = vec![
            ProductId::from("cola"),
            ProductId::from("candy"),
            ProductId::from("chips"),
        ];
        ids.sort();

        let names: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
        assert_eq!(names, ["candy", "chips", "cola"]);
    }
}
