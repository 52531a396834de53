//! Exact monetary amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Number of decimal places every stored amount carries.
pub const MONEY_SCALE: u32 = 2;

/// A non-negative monetary amount with exactly two decimal places.
///
/// Backed by [`Decimal`] so that `price × quantity` sums never drift the way
/// binary floating point would. Serializes as a decimal string (`"25.00"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Creates an amount, rejecting negatives and more than two decimal places.
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::InvalidPrice {
                price: amount.to_string(),
            });
        }
        if amount.normalize().scale() > MONEY_SCALE {
            return Err(DomainError::InvalidPrice {
                price: amount.to_string(),
            });
        }
        let mut amount = amount;
        amount.rescale(MONEY_SCALE);
        Ok(Self(amount))
    }

    /// Parses an amount from its decimal string form (`"10.00"`).
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let amount: Decimal = s.trim().parse().map_err(|_| DomainError::InvalidPrice {
            price: s.to_string(),
        })?;
        Self::new(amount)
    }

    /// Creates an amount from a whole number of cents.
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), MONEY_SCALE))
    }

    /// Returns zero.
    pub fn zero() -> Self {
        Self(Decimal::new(0, MONEY_SCALE))
    }

    /// Returns the underlying decimal.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Adds two amounts.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(DomainError::AmountOverflow)
    }

    /// Multiplies by a quantity.
    pub fn checked_mul(&self, quantity: u32) -> Result<Money, DomainError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money)
            .ok_or(DomainError::AmountOverflow)
    }

    /// Sums a sequence of amounts.
    pub fn sum<I>(amounts: I) -> Result<Money, DomainError>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl std::str::FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}
