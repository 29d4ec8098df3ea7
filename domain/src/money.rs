//! Monetary values: always a decimal amount plus an explicit currency code,
//! never a floating-point number.
//!
//! The teacher's order-processing example represents money as `i64` minor
//! units ("cents"), which is exact but silently assumes a currency with
//! two-decimal minor units and loses the currency itself. Spec §6 and the
//! boundary behaviour "currencies with three-decimal minor units" (§8)
//! rule that assumption out, so this replaces it with [`rust_decimal::Decimal`]
//! plus an ISO 4217 currency code, matching the wire-compatibility
//! requirement that "monetary fields are string-typed decimals with
//! explicit currency codes".

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use thiserror::Error;

/// A monetary amount in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

/// Errors from money arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Attempted to combine two amounts in different currencies.
    #[error("currency mismatch: {lhs} vs {rhs}")]
    CurrencyMismatch {
        /// Left-hand currency.
        lhs: CurrencyCode,
        /// Right-hand currency.
        rhs: CurrencyCode,
    },
}

impl Money {
    /// Construct a monetary amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// The zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency this amount is denominated in.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Multiply by an integer quantity (e.g. unit price × line item qty).
    #[must_use]
    pub fn multiply(&self, quantity: u32) -> Self {
        Self {
            amount: self.amount * Decimal::from(quantity),
            currency: self.currency,
        }
    }

    /// Add two amounts, failing if their currencies differ.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if `self` and `other` carry
    /// different currency codes.
    pub fn checked_add(&self, other: &Self) -> Result<Self, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                lhs: self.currency,
                rhs: other.currency,
            });
        }
        Ok(Self {
            amount: self.amount + other.amount,
            currency: self.currency,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// ISO 4217 three-letter currency code.
///
/// Kept as a fixed enum of the channels' supported currencies rather than
/// an open string, so an unrecognised code is a parse error at the adapter
/// boundary rather than a silent typo propagating into totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    /// US Dollar.
    Usd,
    /// Euro.
    Eur,
    /// British Pound.
    Gbp,
    /// Canadian Dollar.
    Cad,
    /// Japanese Yen.
    Jpy,
    /// Kuwaiti Dinar (three-decimal minor unit, per the boundary case in §8).
    Kwd,
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Cad => "CAD",
            Self::Jpy => "JPY",
            Self::Kwd => "KWD",
        };
        write!(f, "{code}")
    }
}

impl Add for Money {
    type Output = Self;

    /// Panics if currencies differ; prefer [`Money::checked_add`] when the
    /// currencies aren't already known to match.
    fn add(self, rhs: Self) -> Self::Output {
        self.checked_add(&rhs)
            .unwrap_or_else(|_| panic!("Money::add requires matching currencies"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_scales_amount() {
        let price = Money::new(Decimal::new(1999, 2), CurrencyCode::Usd);
        let total = price.multiply(3);
        assert_eq!(total.amount(), Decimal::new(5997, 2));
    }

    #[test]
    fn checked_add_rejects_mismatched_currency() {
        let usd = Money::new(Decimal::new(10, 0), CurrencyCode::Usd);
        let eur = Money::new(Decimal::new(10, 0), CurrencyCode::Eur);
        assert!(matches!(
            usd.checked_add(&eur),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn three_decimal_minor_unit_currency_is_exact() {
        let kwd = Money::new(Decimal::new(1234, 3), CurrencyCode::Kwd);
        assert_eq!(kwd.multiply(2).amount(), Decimal::new(2468, 3));
    }
}
