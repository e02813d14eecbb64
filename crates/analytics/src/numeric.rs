//! Numeric helpers shared by the analyzers.
//!
//! Nothing here formats for display. These functions normalise magnitudes,
//! percentages and scores so thresholds can be compared exactly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const HUNDRED: Decimal = dec!(100);

/// Order of magnitude of a currency amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    Units,
    Thousands,
    Millions,
    Billions,
}

impl Magnitude {
    /// Classifies the absolute value of `amount`.
    pub fn of(amount: Decimal) -> Self {
        let abs = amount.abs();
        if abs >= dec!(1000000000) {
            Magnitude::Billions
        } else if abs >= dec!(1000000) {
            Magnitude::Millions
        } else if abs >= dec!(1000) {
            Magnitude::Thousands
        } else {
            Magnitude::Units
        }
    }

    pub fn divisor(&self) -> Decimal {
        match self {
            Magnitude::Units => Decimal::ONE,
            Magnitude::Thousands => dec!(1000),
            Magnitude::Millions => dec!(1000000),
            Magnitude::Billions => dec!(1000000000),
        }
    }

    /// Expresses `amount` in this magnitude's unit.
    pub fn scale(&self, amount: Decimal) -> Decimal {
        amount / self.divisor()
    }
}

/// `part / whole * 100`, or `None` when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    Some(part / whole * HUNDRED)
}

/// Clamps a score onto the closed `[0, 100]` axis.
pub fn clamp_score(score: Decimal) -> Decimal {
    score.clamp(Decimal::ZERO, HUNDRED)
}

/// Rounds half away from zero to a whole point on the score axis.
pub fn round_score(score: Decimal) -> u8 {
    clamp_score(score)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u8()
        .unwrap_or(0)
}

/// Rounds a currency amount to cents using banker's rounding.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// True when `a` and `b` differ by at most `tolerance`. Values too far apart
/// to subtract are never equal.
pub fn approx_eq(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    a.checked_sub(b).is_some_and(|diff| diff.abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_boundaries_are_inclusive() {
        assert_eq!(Magnitude::of(dec!(999.99)), Magnitude::Units);
        assert_eq!(Magnitude::of(dec!(1000)), Magnitude::Thousands);
        assert_eq!(Magnitude::of(dec!(-2500000)), Magnitude::Millions);
        assert_eq!(Magnitude::of(dec!(1000000000)), Magnitude::Billions);
        assert_eq!(Magnitude::Thousands.scale(dec!(2500)), dec!(2.5));
    }

    #[test]
    fn percentage_of_zero_is_undefined() {
        assert_eq!(percentage(dec!(5), Decimal::ZERO), None);
        assert_eq!(percentage(dec!(25), dec!(200)), Some(dec!(12.5)));
    }

    #[test]
    fn scores_round_half_away_from_zero() {
        assert_eq!(round_score(dec!(74.5)), 75);
        assert_eq!(round_score(dec!(74.49)), 74);
        assert_eq!(round_score(dec!(120)), 100);
        assert_eq!(round_score(dec!(-3)), 0);
    }

    #[test]
    fn approx_eq_respects_tolerance_and_extremes() {
        assert!(approx_eq(dec!(0.9995), Decimal::ONE, dec!(0.001)));
        assert!(!approx_eq(dec!(0.998), Decimal::ONE, dec!(0.001)));
        assert!(!approx_eq(Decimal::MAX, Decimal::MIN, dec!(1)));
    }

    #[test]
    fn money_rounds_to_even_cents() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.00));
        assert_eq!(round_money(dec!(1.015)), dec!(1.02));
    }
}
