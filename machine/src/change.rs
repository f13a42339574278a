//! Greedy change-making against the machine's coin reserve.

use crate::money::{Coin, Money, MoneyCollection};

/// Dispenses `amount` from `reserve`, largest denomination first.
///
/// Works through [`Coin::CHANGE_ORDER`] (quarter, dime, nickel — pennies are
/// never dispensed). For each denomination the full `remaining / face` count
/// is withdrawn, or none at all when the reserve cannot cover it; the
/// remainder then falls through to the next denomination. With a short
/// reserve this can under-dispense, leaving the customer short. That matches
/// the fail-closed withdrawal policy of [`MoneyCollection::withdraw`].
///
/// Returns the coins actually dispensed; the same counts have been deducted
/// from `reserve`.
#[must_use]
pub fn make_change(reserve: &mut MoneyCollection, amount: Money) -> MoneyCollection {
    let mut dispensed = MoneyCollection::default();
    let mut remaining = amount.cents();

    for coin in Coin::CHANGE_ORDER {
        let face = coin.face_value().cents();
        let want = remaining / face;
        if want == 0 || want > u64::from(reserve.count(coin)) {
            continue;
        }

        let count = u32::try_from(want).unwrap_or(0);
        let withdrawn = reserve.withdraw(coin, count);
        dispensed.deposit(coin, withdrawn);
        remaining -= u64::from(withdrawn) * face;
    }

    dispensed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_amount_dispenses_nothing() {
        let mut reserve = MoneyCollection::new(10, 10, 10, 0);
        let dispensed = make_change(&mut reserve, Money::ZERO);

        assert!(dispensed.total().is_zero());
        assert_eq!(reserve.total(), Money::from_cents(400));
    }

    #[test]
    fn whole_dollar_comes_back_as_quarters() {
        let mut reserve = MoneyCollection::new(8, 0, 0, 0);
        let dispensed = make_change(&mut reserve, Money::from_dollars(1));

        assert_eq!(dispensed.count(Coin::Quarter), 4);
        assert_eq!(dispensed.total(), Money::from_dollars(1));
        assert_eq!(reserve.count(Coin::Quarter), 4);
    }

    #[test]
    fn twenty_cents_comes_back_as_dimes() {
        let mut reserve = MoneyCollection::new(4, 2, 0, 0);
        let dispensed = make_change(&mut reserve, Money::from_cents(20));

        assert_eq!(dispensed.count(Coin::Quarter), 0);
        assert_eq!(dispensed.count(Coin::Dime), 2);
        assert_eq!(dispensed.total(), Money::from_cents(20));
    }

    #[test]
    fn five_cents_comes_back_as_a_nickel() {
        let mut reserve = MoneyCollection::new(4, 0, 1, 0);
        let dispensed = make_change(&mut reserve, Money::from_cents(5));

        assert_eq!(dispensed.count(Coin::Nickel), 1);
        assert_eq!(dispensed.total(), Money::from_cents(5));
    }

    #[test]
    fn mixed_remainder_walks_down_the_denominations() {
        let mut reserve = MoneyCollection::new(6, 1, 1, 0);
        let dispensed = make_change(&mut reserve, Money::from_cents(65));

        assert_eq!(dispensed.count(Coin::Quarter), 2);
        assert_eq!(dispensed.count(Coin::Dime), 1);
        assert_eq!(dispensed.count(Coin::Nickel), 1);
        assert_eq!(dispensed.total(), Money::from_cents(65));
    }

    #[test]
    fn short_denomination_is_skipped_not_partially_drained() {
        // Three quarters are owed but only two are held, so quarters are
        // skipped outright and dimes get a shot at the full 75 cents.
        let mut reserve = MoneyCollection::new(2, 8, 0, 0);
        let dispensed = make_change(&mut reserve, Money::from_cents(75));

        assert_eq!(dispensed.count(Coin::Quarter), 0);
        assert_eq!(dispensed.count(Coin::Dime), 7);
        assert_eq!(dispensed.total(), Money::from_cents(70));
        assert_eq!(reserve.count(Coin::Quarter), 2);
        assert_eq!(reserve.count(Coin::Dime), 1);
    }

    #[test]
    fn empty_reserve_dispenses_nothing() {
        let mut reserve = MoneyCollection::default();
        let dispensed = make_change(&mut reserve, Money::from_cents(50));

        assert!(dispensed.total().is_zero());
    }

    #[test]
    fn pennies_are_never_dispensed() {
        let mut reserve = MoneyCollection::new(0, 0, 0, 100);
        let dispensed = make_change(&mut reserve, Money::from_cents(25));

        assert!(dispensed.total().is_zero());
        assert_eq!(reserve.count(Coin::Penny), 100);
    }
}
