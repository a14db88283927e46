//! Type-safe money representation using decimal arithmetic.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount of money with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    #[serde(default)]
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new money value.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// This amount multiplied by a whole quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero(CurrencyCode::default())
    }
}

impl Add for Money {
    type Output = Self;

    /// Adds amounts, keeping the left-hand currency.
    ///
    /// The catalog is single-currency, so mixed currencies never meet here.
    fn add(self, rhs: Self) -> Self {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    INR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::INR => "₹",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        let money = Money::new(Decimal::new(1250, 2), CurrencyCode::USD);
        assert_eq!(money.to_string(), "$12.50");

        let money = Money::new(Decimal::from(3), CurrencyCode::GBP);
        assert_eq!(money.to_string(), "£3.00");
    }

    #[test]
    fn test_money_times_and_sum() {
        let price = Money::new(Decimal::from(10), CurrencyCode::USD);
        let total: Money = [price.times(2), Money::new(Decimal::from(5), CurrencyCode::USD)]
            .into_iter()
            .sum();
        assert_eq!(total.amount, Decimal::from(25));
    }

    #[test]
    fn test_empty_sum_is_zero() {
        let total: Money = core::iter::empty().sum();
        assert_eq!(total, Money::zero(CurrencyCode::USD));
    }
}
