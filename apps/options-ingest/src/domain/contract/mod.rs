//! Option Contract Specification
//!
//! The single listed option a live session streams, and its OCC symbol.
//!
//! # OCC Symbol Layout
//!
//! ```text
//! AAPL 240315 C 00172500
//! root YYMMDD R strike x 1000, 8 digits
//! ```
//!
//! Streams key trades by the compact form without root padding
//! (`AAPL240315C00172500`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::domain::timestamp::parse_date;

/// Largest strike expressible in the 8-digit OCC strike field.
const MAX_STRIKE_MILLIS: u64 = 99_999_999;

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    /// Underlying root is empty or not alphanumeric.
    #[error("invalid underlying symbol: {0:?}")]
    InvalidUnderlying(String),

    /// Expiry is not a calendar date.
    #[error("invalid expiry {0:?}: expected YYYYMMDD")]
    InvalidExpiry(String),

    /// Strike is non-positive, too large or finer than 1/1000.
    #[error("invalid strike: {0}")]
    InvalidStrike(Decimal),

    /// Right is not call or put.
    #[error("invalid option right {0:?}: expected C, P, CALL or PUT")]
    InvalidRight(String),
}

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionRight {
    /// Right to buy.
    Call,
    /// Right to sell.
    Put,
}

impl OptionRight {
    /// Parse `C`, `P`, `CALL` or `PUT` in any case.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidRight`] for anything else.
    pub fn parse(value: &str) -> Result<Self, ContractError> {
        match value.trim().to_uppercase().as_str() {
            "C" | "CALL" => Ok(Self::Call),
            "P" | "PUT" => Ok(Self::Put),
            _ => Err(ContractError::InvalidRight(value.to_string())),
        }
    }

    /// OCC right code.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }
}

/// A single listed option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionContract {
    underlying: String,
    expiry: NaiveDate,
    strike: Decimal,
    right: OptionRight,
    exchange: Option<String>,
    currency: String,
}

impl OptionContract {
    /// Validate and build a contract from user input.
    ///
    /// `expiry` accepts `YYYYMMDD` or `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns a [`ContractError`] describing the first invalid field.
    pub fn new(
        underlying: &str,
        expiry: &str,
        strike: Decimal,
        right: &str,
        exchange: Option<&str>,
        currency: &str,
    ) -> Result<Self, ContractError> {
        let underlying = underlying.trim().to_uppercase();
        if underlying.is_empty() || !underlying.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ContractError::InvalidUnderlying(underlying));
        }

        let expiry = NaiveDate::parse_from_str(expiry.trim(), "%Y%m%d")
            .ok()
            .or_else(|| parse_date(expiry))
            .ok_or_else(|| ContractError::InvalidExpiry(expiry.to_string()))?;

        if strike <= Decimal::ZERO || strike_millis(strike).is_none() {
            return Err(ContractError::InvalidStrike(strike));
        }

        Ok(Self {
            underlying,
            expiry,
            strike,
            right: OptionRight::parse(right)?,
            exchange: exchange
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_uppercase),
            currency: currency.trim().to_uppercase(),
        })
    }

    /// Underlying root symbol.
    #[must_use]
    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    /// Expiration date.
    #[must_use]
    pub const fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    /// Strike price.
    #[must_use]
    pub const fn strike(&self) -> Decimal {
        self.strike
    }

    /// Call or put.
    #[must_use]
    pub const fn right(&self) -> OptionRight {
        self.right
    }

    /// Requested listing exchange, if any.
    #[must_use]
    pub fn exchange(&self) -> Option<&str> {
        self.exchange.as_deref()
    }

    /// Settlement currency.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Compact OCC symbol, e.g. `AAPL240315C00172500`.
    #[must_use]
    pub fn occ_symbol(&self) -> String {
        // Strike was range-checked in `new`.
        let strike = strike_millis(self.strike).unwrap_or_default();
        format!(
            "{}{}{}{:08}",
            self.underlying,
            self.expiry.format("%y%m%d"),
            self.right.code(),
            strike
        )
    }
}

fn strike_millis(strike: Decimal) -> Option<u64> {
    let millis = strike * Decimal::from(1000);
    if !millis.fract().is_zero() {
        return None;
    }
    millis.to_u64().filter(|m| *m <= MAX_STRIKE_MILLIS)
}
