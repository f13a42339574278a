//! Coin denominations and fixed-point currency values.
//!
//! All arithmetic is integer cents; the decimal form (`$X.XX`) exists only
//! at the formatting boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════
// Coin
// ═══════════════════════════════════════════════════════════════════════

/// A single U.S. coin denomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coin {
    /// 25 cents.
    Quarter,
    /// 10 cents.
    Dime,
    /// 5 cents.
    Nickel,
    /// 1 cent. Never accepted as payment and never dispensed as change;
    /// an inserted penny goes straight to the coin return.
    Penny,
}

impl Coin {
    /// Every denomination, in the order the views render them.
    pub const ALL: [Self; 4] = [Self::Quarter, Self::Dime, Self::Nickel, Self::Penny];

    /// Denominations the machine credits as payment.
    pub const ACCEPTED: [Self; 3] = [Self::Quarter, Self::Dime, Self::Nickel];

    /// Fixed greedy order for change-making, largest face value first.
    pub const CHANGE_ORDER: [Self; 3] = [Self::Quarter, Self::Dime, Self::Nickel];

    /// Face value of the coin.
    #[must_use]
    pub const fn face_value(self) -> Money {
        match self {
            Self::Quarter => Money::from_cents(25),
            Self::Dime => Money::from_cents(10),
            Self::Nickel => Money::from_cents(5),
            Self::Penny => Money::from_cents(1),
        }
    }

    /// Plural label used by the tray and diagnostics views.
    #[must_use]
    pub const fn plural_label(self) -> &'static str {
        match self {
            Self::Quarter => "Quarters",
            Self::Dime => "Dimes",
            Self::Nickel => "Nickels",
            Self::Penny => "Pennies",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Money
// ═══════════════════════════════════════════════════════════════════════

/// A currency amount in whole cents.
///
/// # Examples
///
/// ```
/// use vending_machine::Money;
///
/// let price: Money = "$1.00".parse()?;
/// assert_eq!(price, Money::from_cents(100));
/// assert_eq!(price.to_string(), "$1.00");
/// # Ok::<(), vending_machine::money::ParseMoneyError>(())
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(u64);

impl Money {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from whole cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates an amount from whole dollars.
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars * 100)
    }

    /// The amount in cents.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked subtraction; `None` when `other` exceeds `self`.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Error returned when a currency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid currency amount: {0:?}")]
pub struct ParseMoneyError(pub String);

impl FromStr for Money {
    type Err = ParseMoneyError;

    /// Parses `$X.XX` (leading `$` optional). Fraction digits beyond the
    /// second round to the nearest cent, half away from zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMoneyError(s.to_string());
        let raw = s.trim();
        let raw = raw.strip_prefix('$').unwrap_or(raw);

        let (whole, fraction) = match raw.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (raw, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(err());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }

        let dollars: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err())?
        };

        let digits = fraction.as_bytes();
        let tens = digits.first().map_or(0, |b| u64::from(b - b'0'));
        let ones = digits.get(1).map_or(0, |b| u64::from(b - b'0'));
        let mut cents = tens * 10 + ones;
        if digits.get(2).is_some_and(|b| b - b'0' >= 5) {
            cents += 1;
        }

        dollars
            .checked_mul(100)
            .and_then(|total| total.checked_add(cents))
            .map(Self)
            .ok_or_else(err)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// MoneyCollection
// ═══════════════════════════════════════════════════════════════════════

/// Per-denomination coin counts.
///
/// Serves two roles: the machine's internal change reserve, and the
/// customer-facing coin return tray.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyCollection {
    quarters: u32,
    dimes: u32,
    nickels: u32,
    pennies: u32,
}

impl MoneyCollection {
    /// Creates a collection from per-denomination counts.
    #[must_use]
    pub const fn new(quarters: u32, dimes: u32, nickels: u32, pennies: u32) -> Self {
        Self {
            quarters,
            dimes,
            nickels,
            pennies,
        }
    }

    /// The number of coins held for a denomination.
    #[must_use]
    pub const fn count(&self, coin: Coin) -> u32 {
        match coin {
            Coin::Quarter => self.quarters,
            Coin::Dime => self.dimes,
            Coin::Nickel => self.nickels,
            Coin::Penny => self.pennies,
        }
    }

    /// Total value of all held coins.
    #[must_use]
    pub fn total(&self) -> Money {
        let cents = u64::from(self.quarters) * 25
            + u64::from(self.dimes) * 10
            + u64::from(self.nickels) * 5
            + u64::from(self.pennies);
        Money::from_cents(cents)
    }

    /// Adds `count` coins of a denomination.
    pub const fn deposit(&mut self, coin: Coin, count: u32) {
        let slot = self.slot_mut(coin);
        *slot = slot.saturating_add(count);
    }

    /// Moves every coin from `other` into `self`.
    pub fn deposit_all(&mut self, other: &Self) {
        for coin in Coin::ALL {
            self.deposit(coin, other.count(coin));
        }
    }

    /// Removes `count` coins of a denomination, failing closed.
    ///
    /// When the holdings are short, nothing moves and zero is returned;
    /// there is no partial withdrawal of a denomination. Returns the number
    /// of coins actually removed (either `count` or zero).
    pub const fn withdraw(&mut self, coin: Coin, count: u32) -> u32 {
        let slot = self.slot_mut(coin);
        if *slot < count {
            return 0;
        }
        *slot -= count;
        count
    }

    /// Empties the collection.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    const fn slot_mut(&mut self, coin: Coin) -> &mut u32 {
        match coin {
            Coin::Quarter => &mut self.quarters,
            Coin::Dime => &mut self.dimes,
            Coin::Nickel => &mut self.nickels,
            Coin::Penny => &mut self.pennies,
        }
    }
}
