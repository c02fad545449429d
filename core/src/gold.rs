//! Gold: the game's currency.
//!
//! RULE: gold is never converted to floating point. All comparisons
//! against costs and reserves go through the integer helpers below.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};

/// Non-negative gold amount. Arithmetic saturates instead of wrapping,
/// so a subtraction can never produce a spurious huge balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gold(pub u128);

impl Gold {
    pub const ZERO: Gold = Gold(0);

    pub const fn new(amount: u128) -> Self {
        Self(amount)
    }

    pub fn saturating_sub(self, rhs: Gold) -> Gold {
        Gold(self.0.saturating_sub(rhs.0))
    }

    /// True when spending `cost` leaves at least `reserve` behind,
    /// i.e. `self - cost >= reserve` evaluated without underflow.
    pub fn can_afford(self, cost: Gold, reserve: Gold) -> bool {
        self.0 >= cost.0.saturating_add(reserve.0)
    }
}

impl Add for Gold {
    type Output = Gold;

    fn add(self, rhs: Gold) -> Gold {
        Gold(self.0.saturating_add(rhs.0))
    }
}

impl Mul<u128> for Gold {
    type Output = Gold;

    fn mul(self, rhs: u128) -> Gold {
        Gold(self.0.saturating_mul(rhs))
    }
}

impl Sum for Gold {
    fn sum<I: Iterator<Item = Gold>>(iter: I) -> Gold {
        iter.fold(Gold::ZERO, |acc, g| acc + g)
    }
}

impl From<u64> for Gold {
    fn from(amount: u64) -> Self {
        Gold(amount as u128)
    }
}

impl fmt::Display for Gold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}g", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_afford_respects_reserve_exactly() {
        let gold = Gold(1_500);
        assert!(gold.can_afford(Gold(1_000), Gold(500)));
        assert!(!gold.can_afford(Gold(1_001), Gold(500)));
        assert!(!gold.can_afford(Gold(1_000), Gold(501)));
    }

    #[test]
    fn cost_above_balance_is_never_affordable() {
        assert!(!Gold(10).can_afford(Gold(11), Gold::ZERO));
        assert!(!Gold(10).can_afford(Gold(u128::MAX), Gold(u128::MAX)));
    }

    #[test]
    fn subtraction_saturates_at_zero() {
        assert_eq!(Gold(5).saturating_sub(Gold(9)), Gold::ZERO);
    }
}
