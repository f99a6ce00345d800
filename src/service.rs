//! Request-level operations: creating rates and converting amounts.

use crate::core::clock::Clock;
use crate::core::conversion;
use crate::core::currency::ExchangeProvider;
use crate::core::rate::{NewRate, Rate};
use crate::core::store::RateStore;
use crate::core::validation::RateValidator;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRateRequest {
    pub first_currency: Option<String>,
    pub second_currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub currency_from: Option<String>,
    pub currency_to: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionQuery {
    pub currency_from: String,
    pub currency_to: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub query: ConversionQuery,
    pub conversion_result: f64,
    pub last_update_time: DateTime<Utc>,
}

fn required_code(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_uppercase())
        .filter(|v| !v.is_empty())
}

fn parse_amount(raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::InvalidAmount(raw.to_string())),
    }
}

/// Composes the store, the provider and the conversion rule behind the API.
pub struct RateService {
    store: Arc<dyn RateStore>,
    provider: Arc<dyn ExchangeProvider>,
    clock: Arc<dyn Clock>,
    api_key: String,
}

impl RateService {
    pub fn new(
        store: Arc<dyn RateStore>,
        provider: Arc<dyn ExchangeProvider>,
        clock: Arc<dyn Clock>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            clock,
            api_key: api_key.into(),
        }
    }

    pub fn store(&self) -> Arc<dyn RateStore> {
        Arc::clone(&self.store)
    }

    /// Creates a rate seeded with the provider's current quote.
    ///
    /// The duplicate check and the insert are separate store calls, so two
    /// concurrent creations of one pair can both succeed.
    pub async fn create_rate(&self, request: CreateRateRequest) -> Result<Rate> {
        let (Some(first), Some(second)) = (
            required_code(request.first_currency),
            required_code(request.second_currency),
        ) else {
            return Err(Error::MissingParameters);
        };
        RateValidator::check_pair(&first, &second)?;

        match self.store.find_by_currencies(&first, &second).await {
            Ok(_) => return Err(Error::Duplicate { first, second }),
            Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let latest = self.provider.latest(&self.api_key, &first).await?;
        let value = latest
            .rate_for(&second)
            .ok_or_else(|| Error::MissingQuote {
                base: first.clone(),
                target: second.clone(),
            })?;
        debug!(base = %latest.base_currency, %second, value, "Seeding new rate");

        let rate = self
            .store
            .create(NewRate::new(first, second, value, self.clock.now()))
            .await?;
        info!(id = rate.id, pair = %rate.pair(), value = rate.value, "Created rate");
        Ok(rate)
    }

    /// Converts an amount with the stored rate for the exact requested direction.
    pub async fn convert(&self, request: ConvertRequest) -> Result<ConversionResult> {
        let (Some(from), Some(to), Some(raw_value)) = (
            required_code(request.currency_from),
            required_code(request.currency_to),
            request.value.filter(|v| !v.trim().is_empty()),
        ) else {
            return Err(Error::MissingParameters);
        };
        let value = parse_amount(&raw_value)?;

        let rate = self.store.find_by_currencies(&from, &to).await?;
        let conversion_result = conversion::convert(&rate, value);
        debug!(pair = %rate.pair(), value, conversion_result, "Converted amount");

        Ok(ConversionResult {
            query: ConversionQuery {
                currency_from: from,
                currency_to: to,
                value,
            },
            conversion_result,
            last_update_time: rate.last_update_time,
        })
    }

    pub async fn list_rates(&self) -> Result<Vec<Rate>> {
        self.store.find_all().await
    }
}
