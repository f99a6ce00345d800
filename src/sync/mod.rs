//! Background refresh of stored rates from the exchange provider.

pub mod pacing;
pub mod scheduler;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::PacingConfig;
use crate::core::currency::ExchangeProvider;
use crate::core::rate::{Rate, RateId};
use crate::core::store::RateStore;
use crate::error::{Error, Result};
use pacing::{FixedDelay, NoPacing, Pacer, TokenBucket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

pub use scheduler::SyncHandle;

pub const DEFAULT_PACING_DELAY: Duration = Duration::from_secs(5);

pub fn pacer_from_config(config: &PacingConfig) -> Arc<dyn Pacer> {
    match config {
        PacingConfig::None => Arc::new(NoPacing),
        PacingConfig::FixedDelay { secs } => Arc::new(FixedDelay::new(Duration::from_secs(*secs))),
        PacingConfig::TokenBucket {
            capacity,
            refill_secs,
        } => Arc::new(TokenBucket::new(*capacity, Duration::from_secs(*refill_secs))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

/// A pair that could not be refreshed during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub id: RateId,
    pub pair: String,
    pub reason: String,
}

/// Outcome of one synchronization tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub updated: Vec<RateId>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.updated.len() + self.failures.len()
    }
}

struct SyncingGuard<'a>(&'a AtomicBool);

impl<'a> SyncingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        SyncingGuard(flag)
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Refreshes every stored rate from the provider, one pair at a time.
///
/// A failing pair is recorded and skipped; it never aborts the rest of the
/// tick and is not retried until the next one.
pub struct RateSynchronizer {
    store: Arc<dyn RateStore>,
    provider: Arc<dyn ExchangeProvider>,
    api_key: String,
    pacer: Arc<dyn Pacer>,
    clock: Arc<dyn Clock>,
    syncing: AtomicBool,
}

impl RateSynchronizer {
    pub fn new(
        store: Arc<dyn RateStore>,
        provider: Arc<dyn ExchangeProvider>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            api_key: api_key.into(),
            pacer: Arc::new(FixedDelay::new(DEFAULT_PACING_DELAY)),
            clock: Arc::new(SystemClock),
            syncing: AtomicBool::new(false),
        }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SyncState {
        if self.syncing.load(Ordering::SeqCst) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    /// Runs one tick over a snapshot of all stored rates.
    ///
    /// Only a failure to read the snapshot itself is returned as an error.
    pub async fn sync_once(&self) -> Result<SyncReport> {
        let _guard = SyncingGuard::enter(&self.syncing);

        let rates = self.store.find_all().await?;
        debug!(count = rates.len(), "Synchronizing rates");

        let mut report = SyncReport::default();
        for (index, rate) in rates.iter().enumerate() {
            if index > 0 {
                self.pacer.pace().await;
            }

            match self.refresh(rate).await {
                Ok(()) => {
                    info!(pair = %rate.pair(), "Rate was successfully updated");
                    report.updated.push(rate.id);
                }
                Err(e) => {
                    warn!(pair = %rate.pair(), error = %e, "Failed to update rate");
                    report.failures.push(SyncFailure {
                        id: rate.id,
                        pair: rate.pair(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            updated = report.updated.len(),
            failed = report.failures.len(),
            "Synchronization tick finished"
        );
        Ok(report)
    }

    async fn refresh(&self, rate: &Rate) -> Result<()> {
        let latest = self
            .provider
            .latest(&self.api_key, &rate.first_currency)
            .await?;
        let value = latest
            .rate_for(&rate.second_currency)
            .ok_or_else(|| Error::MissingQuote {
                base: rate.first_currency.clone(),
                target: rate.second_currency.clone(),
            })?;

        self.store
            .update(&rate.refreshed(value, self.clock.now()))
            .await
    }
}
