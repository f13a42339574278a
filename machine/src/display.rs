//! Rendered text views of machine state.
//!
//! The machine core never prints; it renders strings and hands them to an
//! attached [`DisplaySink`]. The tray and diagnostics views are derived
//! read-only snapshots for secondary readouts.

use crate::catalog::{Product, ProductId};
use crate::money::{Coin, MoneyCollection};
use crate::state::{DisplayState, VendingState};
use chrono::{DateTime, Utc};

/// Receives the front panel text whenever it changes.
///
/// Implementations are called from async tasks and must not block.
pub trait DisplaySink: Send + Sync {
    /// The panel now shows `text`.
    fn text_changed(&self, text: &str);
}

/// The front panel line for a display state.
#[must_use]
pub fn panel_text(display: DisplayState) -> String {
    match display {
        DisplayState::Idle => "INSERT COINS".to_string(),
        DisplayState::ExactChangeOnly => "EXACT CHANGE ONLY".to_string(),
        DisplayState::AmountShown(amount) => format!("INSERTED: {amount}"),
        DisplayState::PriceShown(price) => format!("PRICE: {price}"),
        DisplayState::SoldOut => "SOLD OUT".to_string(),
        DisplayState::ThankYou => "THANK YOU".to_string(),
    }
}

/// The coin-return readout: a header and one line per denomination.
#[must_use]
pub fn tray_text(tray: &MoneyCollection) -> String {
    let lines: Vec<String> = Coin::ALL
        .iter()
        .map(|&coin| format!("{}x {}", tray.count(coin), coin.plural_label()))
        .collect();

    format!("COIN RETURN\n\n{}", lines.join("\n"))
}

/// The operator diagnostics readout: reserve breakdown and product stock.
///
/// Product lines are sorted by id so the output is stable across runs.
#[must_use]
pub fn diagnostics_text(state: &VendingState, as_of: DateTime<Utc>) -> String {
    let counts: Vec<String> = Coin::ALL
        .iter()
        .map(|&coin| format!("{}x {}", state.reserve.count(coin), coin.plural_label()))
        .collect();

    let mut entries: Vec<(&ProductId, &Product)> = state.products.iter().collect();
    entries.sort_by_key(|entry| entry.0);

    let mut lines = vec![
        format!("AS OF {as_of}"),
        format!("RESERVE {} ({})", state.reserve.total(), counts.join(", ")),
    ];
    for (id, product) in entries {
        lines.push(format!(
            "{id} {} {} x{}",
            product.name(),
            product.price(),
            product.inventory()
        ));
    }

    lines.join("\n")
}
