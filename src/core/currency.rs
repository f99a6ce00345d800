//! Exchange rate provider abstractions

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest quotes for one base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub base_currency: String,
    pub rates: HashMap<String, f64>,
}

impl ExchangeRates {
    pub fn rate_for(&self, target: &str) -> Option<f64> {
        self.rates.get(target).copied()
    }
}

#[async_trait]
pub trait ExchangeProvider: Send + Sync {
    /// Fetches the latest rates for `base_currency`. Implementations do not retry.
    async fn latest(&self, api_key: &str, base_currency: &str) -> Result<ExchangeRates>;
}
