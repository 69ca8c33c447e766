//! Money amounts: decimal currency units at the edges, whole cents in storage.

use std::borrow::Cow;

use validator::ValidationError;

/// Largest single price, top-up or withdrawal, in currency units.
pub const MAX_AMOUNT: f64 = 1_000_000.0;

/// Largest balance a wallet may hold, in cents.
pub const MAX_BALANCE_CENTS: i64 = 100_000_000_000;

/// Convert a validated amount to cents.
pub(crate) fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub(crate) fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn has_fractional_cents(amount: f64) -> bool {
    let cents = amount * 100.0;
    (cents - cents.round()).abs() > 1e-6
}

fn invalid(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("amount");
    err.message = Some(Cow::Borrowed(message));
    err
}

/// A strictly positive amount of whole cents, at most [`MAX_AMOUNT`].
pub(crate) fn validate_amount(amount: f64) -> Result<(), ValidationError> {
    if amount <= 0.0 {
        return Err(invalid("must be greater than zero"));
    }
    if amount > MAX_AMOUNT {
        return Err(invalid("must not be more than 1000000"));
    }
    if has_fractional_cents(amount) {
        return Err(invalid("must not have more than two decimal places"));
    }
    Ok(())
}

/// Like [`validate_amount`], but zero is a valid price.
pub(crate) fn validate_price(price: f64) -> Result<(), ValidationError> {
    if price < 0.0 {
        return Err(invalid("must be at least zero"));
    }
    if price == 0.0 {
        return Ok(());
    }
    validate_amount(price)
}
