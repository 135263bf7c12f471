//! Type-safe monetary value with embedded currency.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Currencies supported by the transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    ZAR,
    USD,
    MWK,
    MZN,
}

impl Currency {
    /// Returns the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::ZAR | Currency::USD | Currency::MWK | Currency::MZN => 2,
        }
    }

    /// Returns the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::ZAR => "R",
            Currency::USD => "$",
            Currency::MWK => "MK",
            Currency::MZN => "MT",
        }
    }

    /// Minor units per major unit (10^decimal_places).
    pub fn minor_per_major(&self) -> i64 {
        10i64.pow(self.decimal_places() as u32)
    }

    /// All supported currencies.
    pub fn all() -> &'static [Currency] {
        &[Currency::ZAR, Currency::USD, Currency::MWK, Currency::MZN]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ZAR" => Ok(Currency::ZAR),
            "USD" => Ok(Currency::USD),
            "MWK" => Ok(Currency::MWK),
            "MZN" => Ok(Currency::MZN),
            other => Err(DomainError::UnsupportedCurrency(other.to_string())),
        }
    }
}

/// Type-safe money representation with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (cents)
/// to avoid floating-point precision issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value from minor units.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self { amount, currency })
    }

    /// Creates a zero-value Money for the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Checked addition - returns error if currencies don't match.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        Ok(Money {
            amount: self.amount.saturating_add(other.amount),
            currency: self.currency,
        })
    }

    /// Amount expressed in major units as a float, for rate arithmetic only.
    pub fn as_major_f64(&self) -> f64 {
        self.amount as f64 / self.currency.minor_per_major() as f64
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_major = self.currency.minor_per_major();
        let major = self.amount / per_major;
        let minor = (self.amount % per_major).abs();
        write!(f, "{}{}.{:02}", self.currency.symbol(), major, minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let money = Money::new(50000, Currency::ZAR).unwrap();
        assert_eq!(money.amount(), 50000);
        assert_eq!(money.currency(), Currency::ZAR);
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::new(-100, Currency::USD);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_money_addition() {
        let a = Money::new(50000, Currency::ZAR).unwrap();
        let b = Money::new(1750, Currency::ZAR).unwrap();
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum.amount(), 51750);
    }

    #[test]
    fn test_currency_mismatch() {
        let zar = Money::new(100, Currency::ZAR).unwrap();
        let usd = Money::new(50, Currency::USD).unwrap();
        let result = zar.checked_add(usd);
        assert!(matches!(result, Err(DomainError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(51750, Currency::ZAR).unwrap();
        assert_eq!(format!("{}", money), "R517.50");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("zar".parse::<Currency>().unwrap(), Currency::ZAR);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::USD);
        assert!(matches!(
            "JPY".parse::<Currency>(),
            Err(DomainError::UnsupportedCurrency(_))
        ));
    }
}
