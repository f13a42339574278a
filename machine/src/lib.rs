//! # Vending Machine
//!
//! A coin-operated vending machine built as a reducer-driven state machine:
//! coins and fixed-point currency, a greedy change engine drawing on the
//! machine's own reserve, a product catalog, and a front-panel display with
//! timer-driven transient states.
//!
//! All behavior lives in the pure [`VendingReducer`]; the async
//! [`VendingMachine`] facade runs it on a `vending-runtime` store, surfaces
//! command outcomes as `Result`s, and pushes rendered text to an attached
//! [`DisplaySink`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use vending_machine::{Coin, MachineConfig, VendingEnvironment, VendingMachine};
//!
//! let config = MachineConfig::from_env();
//! let machine = VendingMachine::new(
//!     config.initial_reserve(),
//!     catalog,
//!     VendingEnvironment::default(),
//! );
//!
//! machine.insert_coin(Coin::Quarter).await?;
//! machine.insert_coin(Coin::Quarter).await?;
//! machine.purchase("chips").await?;
//! assert_eq!(machine.display_text().await, "THANK YOU");
//! ```

/// Actions accepted by the reducer: customer and operator commands, timer events
pub mod actions;

/// Products and their stable identifiers
pub mod catalog;

/// Greedy change-making against the coin reserve
pub mod change;

/// Startup configuration from `VENDING_*` environment variables
pub mod config;

/// Rendered text views and the display sink seam
pub mod display;

/// Domain errors
pub mod error;

/// The async machine facade over the store
pub mod machine;

/// Coins, fixed-point currency, and coin collections
pub mod money;

/// The reducer, its environment, and the display timer id
pub mod reducer;

/// Machine state and the display state machine
pub mod state;

pub use actions::VendingAction;
pub use catalog::{Product, ProductId};
pub use config::MachineConfig;
pub use display::DisplaySink;
pub use error::VendingError;
pub use machine::VendingMachine;
pub use money::{Coin, Money, MoneyCollection};
pub use reducer::{VendingEnvironment, VendingReducer, DISPLAY_TIMER};
pub use state::{DisplayState, VendingState};
