//! Invariants every rate must satisfy before it is persisted.

use crate::core::clock::{Clock, SystemClock};
use crate::core::rate::{NewRate, Rate};
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Checks rate records against the currency-code, pair, value and timestamp rules.
#[derive(Clone)]
pub struct RateValidator {
    clock: Arc<dyn Clock>,
}

impl RateValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// A currency code is exactly three ASCII uppercase letters.
    pub fn is_currency_code(code: &str) -> bool {
        code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
    }

    pub fn check_currency(field: &'static str, code: &str) -> Result<(), ValidationError> {
        if Self::is_currency_code(code) {
            Ok(())
        } else {
            Err(ValidationError::InvalidCurrency {
                field,
                code: code.to_string(),
            })
        }
    }

    /// Validates the ordered pair on its own, without a value or timestamp.
    pub fn check_pair(first: &str, second: &str) -> Result<(), ValidationError> {
        Self::check_currency("first_currency", first)?;
        Self::check_currency("second_currency", second)?;
        if first == second {
            return Err(ValidationError::SameCurrency(first.to_string()));
        }
        Ok(())
    }

    pub fn validate(
        &self,
        first: &str,
        second: &str,
        value: f64,
        last_update_time: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        Self::check_pair(first, second)?;

        // NaN fails this comparison too
        if !(value >= 0.0) || value.is_infinite() {
            return Err(ValidationError::InvalidValue(value));
        }

        let now = self.clock.now();
        if last_update_time > now {
            return Err(ValidationError::FutureTimestamp {
                at: last_update_time,
                now,
            });
        }
        Ok(())
    }

    pub fn validate_new(&self, rate: &NewRate) -> Result<(), ValidationError> {
        self.validate(
            &rate.first_currency,
            &rate.second_currency,
            rate.value,
            rate.last_update_time,
        )
    }

    pub fn validate_rate(&self, rate: &Rate) -> Result<(), ValidationError> {
        self.validate(
            &rate.first_currency,
            &rate.second_currency,
            rate.value,
            rate.last_update_time,
        )
    }
}

impl Default for RateValidator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
