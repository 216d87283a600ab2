//! Human-readable decimal amounts and conversion to on-chain atomic units.
//!
//! A resource server publishes `maxAmountRequired` in human units (`"0.01"` SOL,
//! `"1.00"` USDC). Payments carry atomic units (lamports, token base units).
//! [`MoneyAmount`] bridges the two without ever rounding.

use rust_decimal::Decimal;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// A positive decimal value in human-readable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoneyAmount(Decimal);

#[derive(Debug, thiserror::Error)]
pub enum MoneyAmountError {
    #[error("Invalid number format")]
    InvalidFormat,
    #[error("Amount must be positive")]
    NotPositive,
    #[error("Too big of a precision: {money} vs {token} on token")]
    WrongPrecision { money: u32, token: u32 },
    #[error("Amount out of range")]
    OutOfRange,
}

impl MoneyAmount {
    /// Parse a plain decimal string such as `"0.01"` or `"1000"`.
    ///
    /// Negative, zero, and non-numeric inputs are rejected.
    pub fn parse(input: &str) -> Result<Self, MoneyAmountError> {
        let parsed = Decimal::from_str(input).map_err(|_| MoneyAmountError::InvalidFormat)?;
        if parsed.is_sign_negative() || parsed.is_zero() {
            return Err(MoneyAmountError::NotPositive);
        }
        Ok(MoneyAmount(parsed))
    }

    /// Returns the number of digits after the decimal point in the original input.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    /// Returns the absolute mantissa of the decimal value as an unsigned integer.
    pub fn mantissa(&self) -> u128 {
        self.0.mantissa().unsigned_abs()
    }

    /// Converts to atomic units by scaling the mantissa to the token's decimals.
    ///
    /// `"0.01"` with 9 decimals becomes `10_000_000` lamports; `"1.00"` with
    /// 6 decimals becomes `1_000_000`. Fails when the input carries more
    /// precision than the token supports, so nothing is silently truncated.
    pub fn as_atomic(&self, token_decimals: u8) -> Result<u64, MoneyAmountError> {
        let money_decimals = self.scale();
        let token_decimals = token_decimals as u32;
        if money_decimals > token_decimals {
            return Err(MoneyAmountError::WrongPrecision {
                money: money_decimals,
                token: token_decimals,
            });
        }
        let scale_diff = token_decimals - money_decimals;
        let multiplier = 10u64
            .checked_pow(scale_diff)
            .ok_or(MoneyAmountError::OutOfRange)?;
        let digits = u64::try_from(self.mantissa()).map_err(|_| MoneyAmountError::OutOfRange)?;
        digits
            .checked_mul(multiplier)
            .ok_or(MoneyAmountError::OutOfRange)
    }
}

impl FromStr for MoneyAmount {
    type Err = MoneyAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_number() {
        let amount = MoneyAmount::parse("100").unwrap();
        assert_eq!(amount.as_atomic(6).unwrap(), 100_000_000);
    }

    #[test]
    fn parses_fractional_sol() {
        let amount = MoneyAmount::parse("0.01").unwrap();
        assert_eq!(amount.as_atomic(9).unwrap(), 10_000_000);
    }

    #[test]
    fn parses_usdc_style_amount() {
        let amount = MoneyAmount::parse("1.00").unwrap();
        assert_eq!(amount.as_atomic(6).unwrap(), 1_000_000);
    }

    #[test]
    fn exact_precision_is_allowed() {
        let amount = MoneyAmount::parse("0.123456789").unwrap();
        assert_eq!(amount.as_atomic(9).unwrap(), 123_456_789);
    }

    #[test]
    fn excess_precision_is_rejected() {
        let amount = MoneyAmount::parse("1.234").unwrap();
        let err = amount.as_atomic(2).unwrap_err();
        assert!(matches!(err, MoneyAmountError::WrongPrecision { .. }));
    }

    #[test]
    fn rejects_negative() {
        assert!(matches!(
            MoneyAmount::parse("-1"),
            Err(MoneyAmountError::NotPositive)
        ));
    }

    #[test]
    fn rejects_zero() {
        assert!(matches!(
            MoneyAmount::parse("0"),
            Err(MoneyAmountError::NotPositive)
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            MoneyAmount::parse("ten dollars"),
            Err(MoneyAmountError::InvalidFormat)
        ));
    }

    #[test]
    fn overflow_is_an_error() {
        let amount = MoneyAmount::parse("999999999999").unwrap();
        assert!(matches!(
            amount.as_atomic(19),
            Err(MoneyAmountError::OutOfRange)
        ));
    }
}
