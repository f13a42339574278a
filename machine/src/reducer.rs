//! The vending machine reducer: every state transition in one place.
//!
//! All mutation flows through [`VendingReducer::reduce`]; side effects come
//! back as values the runtime executes. The only effect this machine needs is
//! the display-revert timer, registered under [`DISPLAY_TIMER`] so a newer
//! transient display can replace it and an accepted coin can cancel it.

use crate::actions::VendingAction;
use crate::catalog::ProductId;
use crate::change::make_change;
use crate::error::VendingError;
use crate::money::{Coin, Money};
use crate::state::{DisplayState, VendingState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vending_core::delay;
use vending_core::effect::{Effect, EffectId};
use vending_core::environment::{Clock, SystemClock};
use vending_core::reducer::Reducer;
use vending_core::{smallvec, SmallVec};

/// Registry id for the single pending display-revert timer.
pub const DISPLAY_TIMER: EffectId = EffectId::new(1);

/// Dependencies injected into the vending machine.
#[derive(Clone)]
pub struct VendingEnvironment {
    /// Time source, swapped for a fixed clock in tests.
    pub clock: Arc<dyn Clock>,

    /// How long transient displays linger before reverting.
    pub revert_after: Duration,
}

impl VendingEnvironment {
    /// Creates an environment from explicit dependencies.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, revert_after: Duration) -> Self {
        Self {
            clock,
            revert_after,
        }
    }
}

impl Default for VendingEnvironment {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Duration::from_secs(5))
    }
}

/// Reducer driving the whole machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct VendingReducer;

impl Reducer for VendingReducer {
    type State = VendingState;
    type Action = VendingAction;
    type Environment = VendingEnvironment;

    fn reduce(
        &self,
        state: &mut VendingState,
        action: VendingAction,
        env: &VendingEnvironment,
    ) -> SmallVec<[Effect<VendingAction>; 4]> {
        match action {
            VendingAction::InsertCoin { coin } => Self::insert_coin(state, coin),
            VendingAction::Purchase { product } => Self::purchase(state, product, env),
            VendingAction::ReturnCoins => Self::return_coins(state),
            VendingAction::EmptyCoinReturn => Self::empty_coin_return(state),
            VendingAction::SetProductPrice { product, price } => {
                Self::set_product_price(state, product, price)
            },
            VendingAction::SetProductInventory { product, count } => {
                Self::set_product_inventory(state, product, count)
            },
            VendingAction::DisplayTimerElapsed => Self::display_timer_elapsed(state),
        }
    }
}

impl VendingReducer {
    /// Pennies bounce straight to the tray; everything else becomes credit
    /// and joins the reserve immediately.
    fn insert_coin(state: &mut VendingState, coin: Coin) -> SmallVec<[Effect<VendingAction>; 4]> {
        state.last_error = None;

        if coin == Coin::Penny {
            state.tray.deposit(Coin::Penny, 1);
            debug!("Penny rejected into the coin return tray");
            return smallvec![Effect::None];
        }

        state.inserted = state.inserted.saturating_add(coin.face_value());
        state.reserve.deposit(coin, 1);
        state.display = DisplayState::AmountShown(state.inserted);
        debug!(coin = ?coin, inserted = %state.inserted, "Coin accepted");

        // AmountShown is not transient, so nothing is rescheduled.
        smallvec![Effect::Cancel(DISPLAY_TIMER)]
    }

    fn purchase(
        state: &mut VendingState,
        product: ProductId,
        env: &VendingEnvironment,
    ) -> SmallVec<[Effect<VendingAction>; 4]> {
        state.last_error = None;

        let Some((price, available)) = state
            .products
            .get(&product)
            .map(|p| (p.price(), p.available()))
        else {
            warn!(product = %product, "Purchase for unknown product");
            state.last_error = Some(VendingError::UnknownProduct { product });
            return smallvec![Effect::None];
        };

        if !available {
            debug!(product = %product, "Purchase rejected: sold out");
            state.last_error = Some(VendingError::OutOfStock { product });
            state.display = DisplayState::SoldOut;
            return Self::schedule_revert(env);
        }

        let inserted = state.inserted;
        if inserted < price {
            debug!(product = %product, price = %price, inserted = %inserted, "Purchase rejected: underpaid");
            state.last_error = Some(VendingError::Underpaid { price, inserted });
            state.display = DisplayState::PriceShown(price);
            return Self::schedule_revert(env);
        }

        if inserted != price && state.exact_change_only() {
            debug!(product = %product, price = %price, inserted = %inserted, "Purchase rejected: exact change required");
            state.last_error = Some(VendingError::ExactChangeRequired { price, inserted });
            state.display = DisplayState::PriceShown(price);
            return Self::schedule_revert(env);
        }

        let Some(slot) = state.products.get_mut(&product) else {
            state.last_error = Some(VendingError::UnknownProduct { product });
            return smallvec![Effect::None];
        };
        if let Err(err) = slot.item_sold() {
            state.last_error = Some(err);
            state.display = DisplayState::SoldOut;
            return Self::schedule_revert(env);
        }

        let change = inserted.checked_sub(price).unwrap_or(Money::ZERO);
        if !change.is_zero() {
            let dispensed = make_change(&mut state.reserve, change);
            state.tray.deposit_all(&dispensed);
        }
        state.inserted = Money::ZERO;
        state.display = DisplayState::ThankYou;
        info!(product = %product, price = %price, change = %change, "Product dispensed");

        Self::schedule_revert(env)
    }

    /// Returning credit runs through the change engine, so a depleted
    /// reserve can under-return just as a purchase can.
    fn return_coins(state: &mut VendingState) -> SmallVec<[Effect<VendingAction>; 4]> {
        state.last_error = None;

        let returned = make_change(&mut state.reserve, state.inserted);
        state.tray.deposit_all(&returned);
        state.inserted = Money::ZERO;
        state.display = state.idle_display();
        info!(returned = %returned.total(), "Inserted coins returned");

        smallvec![Effect::Cancel(DISPLAY_TIMER)]
    }

    fn empty_coin_return(state: &mut VendingState) -> SmallVec<[Effect<VendingAction>; 4]> {
        state.last_error = None;
        state.tray.clear();
        debug!("Coin return tray emptied");

        smallvec![Effect::None]
    }

    fn set_product_price(
        state: &mut VendingState,
        product: ProductId,
        price: Money,
    ) -> SmallVec<[Effect<VendingAction>; 4]> {
        state.last_error = None;

        match state.products.get_mut(&product) {
            Some(slot) => {
                slot.set_price(price);
                info!(product = %product, price = %price, "Product repriced");
            },
            None => {
                warn!(product = %product, "Reprice for unknown product");
                state.last_error = Some(VendingError::UnknownProduct { product });
            },
        }

        smallvec![Effect::None]
    }

    fn set_product_inventory(
        state: &mut VendingState,
        product: ProductId,
        count: u32,
    ) -> SmallVec<[Effect<VendingAction>; 4]> {
        state.last_error = None;

        match state.products.get_mut(&product) {
            Some(slot) => {
                slot.set_inventory(count);
                info!(product = %product, count, "Product restocked");
            },
            None => {
                warn!(product = %product, "Restock for unknown product");
                state.last_error = Some(VendingError::UnknownProduct { product });
            },
        }

        smallvec![Effect::None]
    }

    /// A timer that lost the race to a newer display finds nothing transient
    /// and leaves the state alone.
    fn display_timer_elapsed(state: &mut VendingState) -> SmallVec<[Effect<VendingAction>; 4]> {
        if state.display.is_transient() {
            state.display = state.revert_display();
            debug!(display = ?state.display, "Transient display reverted");
        }

        smallvec![Effect::None]
    }

    /// Registering under [`DISPLAY_TIMER`] replaces any pending revert.
    fn schedule_revert(env: &VendingEnvironment) -> SmallVec<[Effect<VendingAction>; 4]> {
        smallvec![Effect::cancellable(
            DISPLAY_TIMER,
            delay! {
                duration: env.revert_after,
                action: VendingAction::DisplayTimerElapsed
            }
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::money::MoneyCollection;
    use std::collections::HashMap;
    use vending_testing::assertions::{
        assert_cancellable_delay, assert_has_cancel, assert_no_effects,
    };
    use vending_testing::{test_clock, ReducerTest};

    fn test_env() -> VendingEnvironment {
        VendingEnvironment::new(Arc::new(test_clock()), Duration::from_secs(5))
    }

    fn catalog() -> HashMap<ProductId, Product> {
        HashMap::from([
            (
                ProductId::from("cola"),
                Product::new("Cola", Money::from_dollars(1), 3),
            ),
            (
                ProductId::from("chips"),
                Product::new("Chips", Money::from_cents(50), 10),
            ),
            (
                ProductId::from("candy"),
                Product::new("Candy", Money::from_cents(65), 10),
            ),
        ])
    }

    fn stocked_state() -> VendingState {
        VendingState::new(MoneyCollection::new(10, 10, 10, 0), catalog())
    }

    fn inventory_of(state: &VendingState, id: &str) -> Option<u32> {
        state.products.get(&ProductId::from(id)).map(Product::inventory)
    }

    #[test]
    fn penny_is_routed_to_the_tray() {
        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(stocked_state())
            .when_action(VendingAction::InsertCoin { coin: Coin::Penny })
            .then_state(|state| {
                assert_eq!(state.inserted, Money::ZERO);
                assert_eq!(state.tray.count(Coin::Penny), 1);
                assert_eq!(state.display, DisplayState::Idle);
                assert_eq!(state.last_error, None);
            })
            .then_effects(|effects| assert_no_effects(effects))
            .run();
    }

    #[test]
    fn quarter_credits_and_joins_the_reserve() {
        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(stocked_state())
            .when_action(VendingAction::InsertCoin {
                coin: Coin::Quarter,
            })
            .then_state(|state| {
                assert_eq!(state.inserted, Money::from_cents(25));
                assert_eq!(state.reserve.count(Coin::Quarter), 11);
                assert!(state.tray.total().is_zero());
                assert_eq!(state.display, DisplayState::AmountShown(Money::from_cents(25)));
            })
            .then_effects(|effects| assert_has_cancel(effects, DISPLAY_TIMER))
            .run();
    }

    #[test]
    fn credit_accumulates_across_insertions() {
        let mut state = stocked_state();
        state.inserted = Money::from_cents(50);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::InsertCoin { coin: Coin::Dime })
            .then_state(|state| {
                assert_eq!(state.inserted, Money::from_cents(60));
                assert_eq!(state.display, DisplayState::AmountShown(Money::from_cents(60)));
            })
            .run();
    }

    #[test]
    fn exact_payment_vends_without_change() {
        let mut state = stocked_state();
        state.inserted = Money::from_dollars(1);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::Purchase {
                product: ProductId::from("cola"),
            })
            .then_state(|state| {
                assert_eq!(state.inserted, Money::ZERO);
                assert!(state.tray.total().is_zero());
                assert_eq!(inventory_of(state, "cola"), Some(2));
                assert_eq!(state.display, DisplayState::ThankYou);
                assert_eq!(state.last_error, None);
            })
            .then_effects(|effects| assert_cancellable_delay(effects, DISPLAY_TIMER))
            .run();
    }

    #[test]
    fn overpayment_returns_change_to_the_tray() {
        let mut state = stocked_state();
        state.inserted = Money::from_dollars(2);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::Purchase {
                product: ProductId::from("cola"),
            })
            .then_state(|state| {
                assert_eq!(state.inserted, Money::ZERO);
                assert_eq!(state.tray.count(Coin::Quarter), 4);
                assert_eq!(state.tray.total(), Money::from_dollars(1));
                assert_eq!(state.reserve.count(Coin::Quarter), 6);
                assert_eq!(state.display, DisplayState::ThankYou);
            })
            .run();
    }

    #[test]
    fn underpayment_shows_the_price_and_keeps_credit() {
        let mut state = stocked_state();
        state.inserted = Money::from_cents(25);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::Purchase {
                product: ProductId::from("cola"),
            })
            .then_state(|state| {
                assert_eq!(state.inserted, Money::from_cents(25));
                assert_eq!(state.display, DisplayState::PriceShown(Money::from_dollars(1)));
                assert_eq!(inventory_of(state, "cola"), Some(3));
                assert_eq!(
                    state.last_error,
                    Some(VendingError::Underpaid {
                        price: Money::from_dollars(1),
                        inserted: Money::from_cents(25),
                    })
                );
            })
            .then_effects(|effects| assert_cancellable_delay(effects, DISPLAY_TIMER))
            .run();
    }

    #[test]
    fn sold_out_takes_precedence_over_payment() {
        let mut state = stocked_state();
        state.inserted = Money::from_dollars(1);
        state.products.insert(
            ProductId::from("cola"),
            Product::new("Cola", Money::from_dollars(1), 0),
        );

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::Purchase {
                product: ProductId::from("cola"),
            })
            .then_state(|state| {
                assert_eq!(state.inserted, Money::from_dollars(1));
                assert_eq!(state.display, DisplayState::SoldOut);
                assert_eq!(
                    state.last_error,
                    Some(VendingError::OutOfStock {
                        product: ProductId::from("cola"),
                    })
                );
            })
            .then_effects(|effects| assert_cancellable_delay(effects, DISPLAY_TIMER))
            .run();
    }

    #[test]
    fn exact_change_mode_rejects_inexact_payment() {
        let mut state = VendingState::new(MoneyCollection::new(3, 0, 0, 0), catalog());
        state.inserted = Money::from_cents(125);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::Purchase {
                product: ProductId::from("cola"),
            })
            .then_state(|state| {
                assert_eq!(state.inserted, Money::from_cents(125));
                assert_eq!(state.display, DisplayState::PriceShown(Money::from_dollars(1)));
                assert_eq!(
                    state.last_error,
                    Some(VendingError::ExactChangeRequired {
                        price: Money::from_dollars(1),
                        inserted: Money::from_cents(125),
                    })
                );
            })
            .run();
    }

    #[test]
    fn exact_change_mode_still_sells_exact_payment() {
        let mut state = VendingState::new(MoneyCollection::new(3, 0, 0, 0), catalog());
        state.inserted = Money::from_dollars(1);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::Purchase {
                product: ProductId::from("cola"),
            })
            .then_state(|state| {
                assert_eq!(state.inserted, Money::ZERO);
                assert_eq!(state.display, DisplayState::ThankYou);
                assert_eq!(inventory_of(state, "cola"), Some(2));
                assert_eq!(state.last_error, None);
            })
            .run();
    }

    #[test]
    fn unknown_product_leaves_the_machine_untouched() {
        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(stocked_state())
            .when_action(VendingAction::Purchase {
                product: ProductId::from("espresso"),
            })
            .then_state(|state| {
                assert_eq!(state.display, DisplayState::Idle);
                assert_eq!(
                    state.last_error,
                    Some(VendingError::UnknownProduct {
                        product: ProductId::from("espresso"),
                    })
                );
            })
            .then_effects(|effects| assert_no_effects(effects))
            .run();
    }

    #[test]
    fn return_coins_hands_back_the_credit() {
        let mut state = stocked_state();
        state.inserted = Money::from_cents(75);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::ReturnCoins)
            .then_state(|state| {
                assert_eq!(state.inserted, Money::ZERO);
                assert_eq!(state.tray.count(Coin::Quarter), 3);
                assert_eq!(state.reserve.count(Coin::Quarter), 7);
                assert_eq!(state.display, DisplayState::Idle);
            })
            .then_effects(|effects| assert_has_cancel(effects, DISPLAY_TIMER))
            .run();
    }

    #[test]
    fn emptying_the_tray_clears_only_the_tray() {
        let mut state = stocked_state();
        state.inserted = Money::from_cents(50);
        state.tray.deposit(Coin::Quarter, 2);
        state.tray.deposit(Coin::Penny, 1);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::EmptyCoinReturn)
            .then_state(|state| {
                assert!(state.tray.total().is_zero());
                assert_eq!(state.inserted, Money::from_cents(50));
            })
            .then_effects(|effects| assert_no_effects(effects))
            .run();
    }

    #[test]
    fn operator_can_reprice_and_restock() {
        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(stocked_state())
            .when_action(VendingAction::SetProductPrice {
                product: ProductId::from("chips"),
                price: Money::from_cents(75),
            })
            .then_state(|state| {
                let price = state
                    .products
                    .get(&ProductId::from("chips"))
                    .map(Product::price);
                assert_eq!(price, Some(Money::from_cents(75)));
                assert_eq!(state.last_error, None);
            })
            .then_effects(|effects| assert_no_effects(effects))
            .run();

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(stocked_state())
            .when_action(VendingAction::SetProductInventory {
                product: ProductId::from("candy"),
                count: 0,
            })
            .then_state(|state| {
                assert_eq!(inventory_of(state, "candy"), Some(0));
            })
            .run();
    }

    #[test]
    fn operator_update_for_unknown_product_fails() {
        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(stocked_state())
            .when_action(VendingAction::SetProductPrice {
                product: ProductId::from("espresso"),
                price: Money::from_cents(75),
            })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(VendingError::UnknownProduct {
                        product: ProductId::from("espresso"),
                    })
                );
            })
            .run();
    }

    #[test]
    fn timer_reverts_a_transient_display() {
        let mut state = stocked_state();
        state.display = DisplayState::ThankYou;

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::DisplayTimerElapsed)
            .then_state(|state| {
                assert_eq!(state.display, DisplayState::Idle);
            })
            .then_effects(|effects| assert_no_effects(effects))
            .run();
    }

    #[test]
    fn timer_prefers_the_running_total() {
        let mut state = stocked_state();
        state.display = DisplayState::SoldOut;
        state.inserted = Money::from_cents(50);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::DisplayTimerElapsed)
            .then_state(|state| {
                assert_eq!(state.display, DisplayState::AmountShown(Money::from_cents(50)));
            })
            .run();
    }

    #[test]
    fn timer_respects_low_reserve() {
        let mut state = VendingState::new(MoneyCollection::new(3, 0, 0, 0), catalog());
        state.display = DisplayState::ThankYou;

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::DisplayTimerElapsed)
            .then_state(|state| {
                assert_eq!(state.display, DisplayState::ExactChangeOnly);
            })
            .run();
    }

    #[test]
    fn stale_timer_leaves_a_reset_display_alone() {
        let mut state = stocked_state();
        state.display = DisplayState::AmountShown(Money::from_cents(25));
        state.inserted = Money::from_cents(25);

        ReducerTest::new(VendingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(VendingAction::DisplayTimerElapsed)
            .then_state(|state| {
                assert_eq!(state.display, DisplayState::AmountShown(Money::from_cents(25)));
            })
            .run();
    }
}
