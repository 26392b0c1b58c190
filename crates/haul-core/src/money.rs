//! # Money Arithmetic
//!
//! All monetary values in the Haul Stack are `Decimal` amounts in the
//! account currency. Rounding happens to the cent, half away from zero
//! ("round half up" for the positive amounts settlement works with), and is
//! applied to every computed sub-amount before it is combined with another.
//! Rounding only the final total lets per-line drift accumulate across a
//! multi-load trip; rounding each line keeps the totals equal to the sum of
//! what the driver sees on the statement.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ValidationError;

/// Number of decimal places kept for currency amounts.
pub const CENT_SCALE: u32 = 2;

/// Largest amount, reading, or volume accepted from callers.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Reject a caller-supplied quantity above [`MAX_AMOUNT`].
pub fn check_limit(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value > MAX_AMOUNT {
        return Err(ValidationError::invalid(
            field,
            format!("must not exceed {MAX_AMOUNT}"),
        ));
    }
    Ok(())
}

/// Round an amount to cents, half away from zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CENT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Multiply two quantities and round the product to cents.
///
/// This is the one entry point for `quantity × rate` products (miles × rate,
/// cubic feet × rate, days × daily rate).
pub fn times_rate(quantity: Decimal, rate: Decimal) -> Decimal {
    round_cents(quantity.saturating_mul(rate))
}

/// `percent` percent of `amount`, rounded to cents.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_cents(amount.saturating_mul(percent) / Decimal::ONE_HUNDRED)
}

/// Sum already-rounded amounts, rounding each term first. Saturates at
/// `Decimal::MAX` instead of overflowing.
pub fn sum_cents<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .map(round_cents)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rounds_midpoint_up() {
        assert_eq!(round_cents(dec("2.345")), dec("2.35"));
        assert_eq!(round_cents(dec("2.344")), dec("2.34"));
        assert_eq!(round_cents(dec("0.005")), dec("0.01"));
    }

    #[test]
    fn negative_midpoint_rounds_away_from_zero() {
        assert_eq!(round_cents(dec("-2.345")), dec("-2.35"));
    }

    #[test]
    fn mileage_product_rounds_to_cents() {
        assert_eq!(times_rate(dec("450"), dec("0.55")), dec("247.50"));
        assert_eq!(times_rate(dec("333"), dec("0.555")), dec("184.82"));
    }

    #[test]
    fn percent_of_revenue() {
        assert_eq!(percent_of(dec("4200"), dec("25")), dec("1050.00"));
        assert_eq!(percent_of(dec("1234.57"), dec("12.5")), dec("154.32"));
    }

    #[test]
    fn per_term_rounding_differs_from_total_rounding() {
        // 3 × 0.005 rounds to 0.03 per term, 0.02 if rounded once at the end.
        let terms = vec![dec("0.005"); 3];
        assert_eq!(sum_cents(terms), dec("0.03"));
    }

    #[test]
    fn limit_accepts_the_bound_and_rejects_above() {
        assert!(check_limit("contract_rate", MAX_AMOUNT).is_ok());
        let err = check_limit("contract_rate", dec("50000000000000000000000000000")).unwrap_err();
        assert_eq!(err.field(), "contract_rate");
    }

    #[test]
    fn huge_terms_saturate_instead_of_panicking() {
        let huge = dec("50000000000000000000000000000");
        assert_eq!(sum_cents(vec![huge, huge]), Decimal::MAX);
        assert_eq!(times_rate(huge, dec("10")), Decimal::MAX);
    }

    proptest! {
        #[test]
        fn rounding_is_idempotent(cents in -10_000_000i64..10_000_000i64, extra in 0u32..1000) {
            let amount = Decimal::new(cents * 1000 + i64::from(extra), 5);
            let once = round_cents(amount);
            prop_assert_eq!(round_cents(once), once);
            prop_assert!(once.scale() <= CENT_SCALE);
        }

        #[test]
        fn rounding_moves_at_most_half_a_cent(raw in -1_000_000_000i64..1_000_000_000i64) {
            let amount = Decimal::new(raw, 4);
            let diff = (round_cents(amount) - amount).abs();
            prop_assert!(diff <= dec("0.005"));
        }
    }
}
