//! The machine facade: an async, store-backed front for the reducer.
//!
//! Commands go through [`VendingMachine`] methods, which run the reducer,
//! surface the command's outcome as a `Result`, and push the rendered panel
//! text to an attached [`DisplaySink`]. Timer-driven reverts reach the sink
//! through the store's action broadcast.

use crate::actions::VendingAction;
use crate::catalog::{Product, ProductId};
use crate::display::{self, panel_text, DisplaySink};
use crate::error::VendingError;
use crate::money::{Coin, Money, MoneyCollection};
use crate::reducer::{VendingEnvironment, VendingReducer};
use crate::state::VendingState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vending_runtime::{Store, StoreError};

type MachineStore = Store<VendingState, VendingAction, VendingEnvironment, VendingReducer>;

/// A coin-operated vending machine.
///
/// Construct one with a starting coin reserve and a product catalog, then
/// drive it with the customer and operator methods. All methods take `&self`;
/// concurrent calls serialize at the reducer.
///
/// # Example
///
/// ```ignore
/// let machine = VendingMachine::new(reserve, products, VendingEnvironment::default());
///
/// machine.insert_coin(Coin::Quarter).await?;
/// machine.purchase("chips").await?;
/// ```
pub struct VendingMachine {
    store: MachineStore,
    env: VendingEnvironment,
    sink: Arc<RwLock<Option<Arc<dyn DisplaySink>>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl VendingMachine {
    /// Creates a machine with the given reserve, catalog, and environment.
    ///
    /// The starting display state is derived from the reserve: below $1.00
    /// the machine opens in `EXACT CHANGE ONLY`.
    #[must_use]
    #[allow(clippy::implicit_hasher)] // Catalogs are built once with the default hasher
    pub fn new(
        initial_reserve: MoneyCollection,
        products: HashMap<ProductId, Product>,
        env: VendingEnvironment,
    ) -> Self {
        let reserve_total = initial_reserve.total();
        let product_count = products.len();

        let state = VendingState::new(initial_reserve, products);
        let store = Store::new(state, VendingReducer, env.clone());
        info!(reserve = %reserve_total, products = product_count, "Vending machine ready");

        Self {
            store,
            env,
            sink: Arc::new(RwLock::new(None)),
            listener: Mutex::new(None),
        }
    }

    // ========== Customer operations ==========

    /// Drops a coin into the slot.
    ///
    /// Quarters, dimes, and nickels become credit; pennies land in the
    /// coin-return tray.
    ///
    /// # Errors
    ///
    /// Infallible today — even a rejected penny is a defined routing, not an
    /// error. The `Result` keeps the command surface uniform.
    pub async fn insert_coin(&self, coin: Coin) -> Result<(), VendingError> {
        self.command(VendingAction::InsertCoin { coin }).await
    }

    /// Presses the button for a product.
    ///
    /// # Errors
    ///
    /// - [`VendingError::UnknownProduct`] for an id not in the catalog.
    /// - [`VendingError::OutOfStock`] when the product has no inventory.
    /// - [`VendingError::Underpaid`] when the credit is below the price.
    /// - [`VendingError::ExactChangeRequired`] when the reserve is low and
    ///   the credit overshoots the price.
    pub async fn purchase(&self, product: impl Into<ProductId>) -> Result<(), VendingError> {
        self.command(VendingAction::Purchase {
            product: product.into(),
        })
        .await
    }

    /// Pulls the coin-return lever, sending the credit to the tray.
    ///
    /// # Errors
    ///
    /// Infallible today; returning with no credit is a no-op.
    pub async fn return_coins(&self) -> Result<(), VendingError> {
        self.command(VendingAction::ReturnCoins).await
    }

    /// Scoops everything out of the coin-return tray.
    ///
    /// # Errors
    ///
    /// Infallible today; emptying an empty tray is a no-op.
    pub async fn empty_coin_return(&self) -> Result<(), VendingError> {
        self.command(VendingAction::EmptyCoinReturn).await
    }

    // ========== Operator operations ==========

    /// Reprices a product.
    ///
    /// # Errors
    ///
    /// [`VendingError::UnknownProduct`] for an id not in the catalog.
    pub async fn set_product_price(
        &self,
        product: impl Into<ProductId>,
        price: Money,
    ) -> Result<(), VendingError> {
        self.command(VendingAction::SetProductPrice {
            product: product.into(),
            price,
        })
        .await
    }

    /// Restocks (or zeroes out) a product.
    ///
    /// # Errors
    ///
    /// [`VendingError::UnknownProduct`] for an id not in the catalog.
    pub async fn set_product_inventory(
        &self,
        product: impl Into<ProductId>,
        count: u32,
    ) -> Result<(), VendingError> {
        self.command(VendingAction::SetProductInventory {
            product: product.into(),
            count,
        })
        .await
    }

    // ========== Display ==========

    /// Attaches the front panel.
    ///
    /// The sink immediately receives the current text, then every change:
    /// after each command and after each timer-driven revert. Attaching a new
    /// sink replaces the previous one.
    pub async fn attach_display(&self, sink: Arc<dyn DisplaySink>) {
        let text = self.display_text().await;
        sink.text_changed(&text);

        {
            let mut slot = self.sink.write().unwrap_or_else(PoisonError::into_inner);
            *slot = Some(sink);
        }
        self.ensure_listener();
    }

    // ========== Queries ==========

    /// The customer's current credit.
    pub async fn inserted(&self) -> Money {
        self.store.state(|s| s.inserted).await
    }

    /// Total value of the internal coin reserve.
    pub async fn machine_total(&self) -> Money {
        self.store.state(|s| s.reserve.total()).await
    }

    /// Contents of the coin-return tray.
    pub async fn tray_contents(&self) -> MoneyCollection {
        self.store.state(|s| s.tray.clone()).await
    }

    /// The current front panel line.
    pub async fn display_text(&self) -> String {
        self.store.state(|s| panel_text(s.display)).await
    }

    /// The coin-return readout.
    pub async fn tray_text(&self) -> String {
        self.store.state(|s| display::tray_text(&s.tray)).await
    }

    /// The operator diagnostics readout, stamped with the current time.
    pub async fn diagnostics_text(&self) -> String {
        let as_of = self.env.clock.now();
        self.store
            .state(move |s| display::diagnostics_text(s, as_of))
            .await
    }

    /// A full copy of the machine state, for inspection or persistence.
    pub async fn state_snapshot(&self) -> VendingState {
        self.store.state(Clone::clone).await
    }

    // ========== Lifecycle ==========

    /// Shuts the machine down, waiting for in-flight effects.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownTimeout`] if effects are still running when the
    /// timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.abort_listener();
        self.store.shutdown(timeout).await
    }

    /// Runs one command through the reducer and reports its outcome.
    ///
    /// Commands sent while the store is shutting down are dropped: the
    /// machine is past caring and the caller gets `Ok`.
    async fn command(&self, action: VendingAction) -> Result<(), VendingError> {
        let command = action.label();
        if let Err(err) = self.store.send(action).await {
            warn!(command, error = %err, "Command dropped during shutdown");
            return Ok(());
        }

        let (outcome, text) = self
            .store
            .state(|s| (s.last_error.clone(), panel_text(s.display)))
            .await;
        self.push_display(&text);

        match outcome {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn push_display(&self, text: &str) {
        let slot = self.sink.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(sink) = slot.as_ref() {
            sink.text_changed(text);
        }
    }

    /// Spawns the broadcast listener that forwards timer-driven display
    /// changes to the sink. Idempotent.
    fn ensure_listener(&self) {
        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if listener.is_some() {
            return;
        }

        let store = self.store.clone();
        let sink = Arc::clone(&self.sink);
        let mut actions = self.store.subscribe_actions();

        *listener = Some(tokio::spawn(async move {
            loop {
                match actions.recv().await {
                    Ok(_) => {
                        let text = store.state(|s| panel_text(s.display)).await;
                        let current = sink.read().unwrap_or_else(PoisonError::into_inner).clone();
                        if let Some(sink) = current {
                            sink.text_changed(&text);
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Display listener lagged");
                    },
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    fn abort_listener(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for VendingMachine {
    fn drop(&mut self) {
        // The listener task holds its own store clone and would outlive us.
        self.abort_listener();
    }
}
