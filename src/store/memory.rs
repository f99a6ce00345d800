use crate::core::clock::{Clock, SystemClock};
use crate::core::rate::{NewRate, Rate, RateId};
use crate::core::store::RateStore;
use crate::core::validation::RateValidator;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    rates: BTreeMap<RateId, Rate>,
    last_id: RateId,
}

/// In-memory rate store, mainly for tests and throwaway runs.
pub struct MemoryRateStore {
    inner: RwLock<Inner>,
    validator: RateValidator,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            validator: RateValidator::new(clock),
        }
    }
}

impl Default for MemoryRateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn create(&self, rate: NewRate) -> Result<Rate> {
        self.validator.validate_new(&rate)?;

        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let rate = rate.with_id(inner.last_id);
        inner.rates.insert(rate.id, rate.clone());
        debug!(id = rate.id, pair = %rate.pair(), "Stored new rate");
        Ok(rate)
    }

    async fn find(&self, id: RateId) -> Result<Rate> {
        let inner = self.inner.read().await;
        inner
            .rates
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("rate {id}")))
    }

    async fn find_by_currencies(&self, first: &str, second: &str) -> Result<Rate> {
        let inner = self.inner.read().await;
        inner
            .rates
            .values()
            .find(|r| r.first_currency == first && r.second_currency == second)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("rate {first}-{second}")))
    }

    async fn find_all(&self) -> Result<Vec<Rate>> {
        let inner = self.inner.read().await;
        Ok(inner.rates.values().cloned().collect())
    }

    async fn update(&self, rate: &Rate) -> Result<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .rates
            .get_mut(&rate.id)
            .ok_or_else(|| Error::NotFound(format!("rate {}", rate.id)))?;
        self.validator.validate_rate(rate)?;
        *stored = rate.clone();
        debug!(id = rate.id, pair = %rate.pair(), "Updated rate");
        Ok(())
    }
}
