use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

/// Monetary threshold below which a balance counts as settled.
///
/// One minor unit (0.01 in major units). A pairwise balance whose amount
/// falls to or below this is deleted rather than kept as dust, and net
/// balances inside the threshold are dropped from derived views.
pub const EPSILON_MINOR: i64 = 1;

/// Signed money amount represented as **integer minor units** (cents).
///
/// Use this type for all monetary values that leave raw storage: ledger
/// amounts, net balances, suggested transfers. Integer arithmetic keeps
/// repeated splitting and settling exact, so no per-step rounding policy is
/// needed on top.
///
/// The value is signed:
/// - positive = is owed money (creditor)
/// - negative = owes money (debtor)
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns the absolute value.
    #[must_use]
    pub const fn abs(self) -> MoneyCents {
        MoneyCents(self.0.abs())
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns `true` if the amount is within the settled threshold.
    #[must_use]
    pub const fn is_dust(self) -> bool {
        self.0.abs() <= EPSILON_MINOR
    }

    /// Returns the smaller of two amounts.
    #[must_use]
    pub fn min(self, rhs: MoneyCents) -> MoneyCents {
        MoneyCents(self.0.min(rhs.0))
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "0.01");
        assert_eq!(MoneyCents::new(10).to_string(), "0.10");
        assert_eq!(MoneyCents::new(1050).to_string(), "10.50");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn dust_threshold_is_one_minor_unit() {
        assert!(MoneyCents::new(0).is_dust());
        assert!(MoneyCents::new(1).is_dust());
        assert!(MoneyCents::new(-1).is_dust());
        assert!(!MoneyCents::new(2).is_dust());
    }

    #[test]
    fn arithmetic_is_exact() {
        let mut amount = MoneyCents::new(1000);
        amount -= MoneyCents::new(333);
        amount -= MoneyCents::new(333);
        amount -= MoneyCents::new(334);
        assert_eq!(amount, MoneyCents::ZERO);
        assert_eq!(-MoneyCents::new(5), MoneyCents::new(-5));
        assert_eq!(MoneyCents::new(7).min(MoneyCents::new(3)).cents(), 3);
    }
}
