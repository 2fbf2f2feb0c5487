//! Conversion between display units (what a person types) and base units
//! (the smallest indivisible amount the ledger stores).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Decimal places of hbar: 1 hbar = 10^8 tinybars.
pub const HBAR_DECIMALS: u32 = 8;

/// Largest decimals value a token may declare.
pub const MAX_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("decimals must be at most {MAX_DECIMALS}, got {0}")]
    TooManyDecimals(u32),

    #[error("amount is out of range")]
    OutOfRange,
}

fn scale(decimals: u32) -> Result<Decimal, UnitError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitError::TooManyDecimals(decimals));
    }
    Ok(Decimal::from_i128_with_scale(10i128.pow(decimals), 0))
}

/// Scale a display amount into base units, rounding toward negative infinity.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<i64, UnitError> {
    let factor = scale(decimals)?;
    amount
        .checked_mul(factor)
        .ok_or(UnitError::OutOfRange)?
        .floor()
        .to_i64()
        .ok_or(UnitError::OutOfRange)
}

/// Inverse of [`to_base_units`]. Exact.
pub fn to_display_units(base: i64, decimals: u32) -> Result<Decimal, UnitError> {
    let factor = scale(decimals)?;
    Ok((Decimal::from(base) / factor).normalize())
}

pub fn to_tinybars(hbar: Decimal) -> Result<i64, UnitError> {
    to_base_units(hbar, HBAR_DECIMALS)
}

pub fn to_hbar(tinybars: i64) -> Decimal {
    Decimal::new(tinybars, HBAR_DECIMALS).normalize()
}
