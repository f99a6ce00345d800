//! The exchange rate record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type RateId = u64;

/// A directional exchange rate: `value` units of `second_currency` buy one unit
/// of `first_currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub id: RateId,
    pub first_currency: String,
    pub second_currency: String,
    pub value: f64,
    pub last_update_time: DateTime<Utc>,
}

/// A rate that has not been persisted yet. The store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRate {
    pub first_currency: String,
    pub second_currency: String,
    pub value: f64,
    pub last_update_time: DateTime<Utc>,
}

impl NewRate {
    pub fn new(
        first_currency: impl Into<String>,
        second_currency: impl Into<String>,
        value: f64,
        last_update_time: DateTime<Utc>,
    ) -> Self {
        Self {
            first_currency: first_currency.into(),
            second_currency: second_currency.into(),
            value,
            last_update_time,
        }
    }

    pub fn with_id(self, id: RateId) -> Rate {
        Rate {
            id,
            first_currency: self.first_currency,
            second_currency: self.second_currency,
            value: self.value,
            last_update_time: self.last_update_time,
        }
    }
}

impl Rate {
    /// Pair label such as `USD-RUB`.
    pub fn pair(&self) -> String {
        format!("{}-{}", self.first_currency, self.second_currency)
    }

    /// Copy of this rate carrying a fresh value; id and currencies are kept.
    pub fn refreshed(&self, value: f64, at: DateTime<Utc>) -> Rate {
        Rate {
            value,
            last_update_time: at,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_refreshed_keeps_identity() {
        let created = Utc::now() - Duration::minutes(10);
        let rate = NewRate::new("USD", "RUB", 80.0, created).with_id(7);

        let now = Utc::now();
        let updated = rate.refreshed(85.5, now);

        assert_eq!(updated.id, 7);
        assert_eq!(updated.first_currency, "USD");
        assert_eq!(updated.second_currency, "RUB");
        assert_eq!(updated.value, 85.5);
        assert_eq!(updated.last_update_time, now);
        assert_eq!(rate.pair(), "USD-RUB");
    }
}
