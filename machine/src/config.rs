//! Process configuration for a machine instance.
//!
//! Values come from `VENDING_*` environment variables with sensible
//! defaults; missing or unparseable values fall back rather than fail.

use crate::money::MoneyCollection;
use std::time::Duration;

/// Startup configuration read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// How long transient displays linger before reverting.
    ///
    /// From `VENDING_DISPLAY_REVERT_SECS`. Default: 5 seconds.
    pub display_revert: Duration,

    /// Quarters loaded into the change reserve at startup.
    ///
    /// From `VENDING_RESERVE_QUARTERS`. Default: 10.
    pub reserve_quarters: u32,

    /// Dimes loaded into the change reserve at startup.
    ///
    /// From `VENDING_RESERVE_DIMES`. Default: 10.
    pub reserve_dimes: u32,

    /// Nickels loaded into the change reserve at startup.
    ///
    /// From `VENDING_RESERVE_NICKELS`. Default: 10.
    pub reserve_nickels: u32,
}

impl MachineConfig {
    /// Reads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            display_revert: Duration::from_secs(parse_or(
                std::env::var("VENDING_DISPLAY_REVERT_SECS").ok(),
                defaults.display_revert.as_secs(),
            )),
            reserve_quarters: parse_or(
                std::env::var("VENDING_RESERVE_QUARTERS").ok(),
                defaults.reserve_quarters,
            ),
            reserve_dimes: parse_or(
                std::env::var("VENDING_RESERVE_DIMES").ok(),
                defaults.reserve_dimes,
            ),
            reserve_nickels: parse_or(
                std::env::var("VENDING_RESERVE_NICKELS").ok(),
                defaults.reserve_nickels,
            ),
        }
    }

    /// The coin reserve this configuration loads at startup.
    ///
    /// Pennies are never stocked: they cannot be dispensed as change.
    #[must_use]
    pub const fn initial_reserve(&self) -> MoneyCollection {
        MoneyCollection::new(
            self.reserve_quarters,
            self.reserve_dimes,
            self.reserve_nickels,
            0,
        )
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            display_revert: Duration::from_secs(5),
            reserve_quarters: 10,
            reserve_dimes: 10,
            reserve_nickels: 10,
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
