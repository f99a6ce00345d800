//! Currency conversion using a stored rate.

use crate::core::rate::Rate;

/// Converts `amount` units of `rate.first_currency` into `rate.second_currency`.
///
/// Only the stored direction is used: converting the other way needs its own
/// record, and there is no chaining through intermediate currencies.
pub fn convert(rate: &Rate, amount: f64) -> f64 {
    amount * rate.value
}
