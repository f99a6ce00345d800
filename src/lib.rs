pub mod cli;
pub mod core;
pub mod error;
pub mod providers;
pub mod service;
pub mod store;
pub mod sync;

pub use error::{Error, ErrorBody, Result, ValidationError};

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::providers::FreeCurrencyApiProvider;
use crate::service::RateService;
use crate::sync::{RateSynchronizer, pacer_from_config};
use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Create { first: String, second: String },
    Convert { from: String, to: String, value: String },
    List,
    Sync,
    Run,
}

/// The wired-up service and synchronizer sharing one store.
pub struct App {
    pub service: RateService,
    pub synchronizer: Arc<RateSynchronizer>,
}

impl App {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = store::open_store(&config.store, Arc::clone(&clock))?;
        let provider = Arc::new(
            FreeCurrencyApiProvider::new(&config.provider.base_url, config.provider.timeout())
                .context("Failed to create exchange provider client")?,
        );

        if config.provider.api_key.is_empty() {
            warn!(
                "No provider API key configured; set {} or provider.api_key",
                crate::core::config::API_KEY_ENV
            );
        }

        let service = RateService::new(
            Arc::clone(&store),
            provider.clone(),
            Arc::clone(&clock),
            config.provider.api_key.clone(),
        );
        let synchronizer = RateSynchronizer::new(store, provider, config.provider.api_key.clone())
            .with_pacer(pacer_from_config(&config.sync.pacing))
            .with_clock(clock);

        Ok(App {
            service,
            synchronizer: Arc::new(synchronizer),
        })
    }
}

pub async fn run_command(command: AppCommand, config: AppConfig) -> anyhow::Result<()> {
    info!("Rate keeper starting...");
    debug!("Loaded config: {config:#?}");

    let app = App::from_config(&config)?;

    match command {
        AppCommand::Create { first, second } => {
            cli::rates::create(&app.service, &first, &second).await
        }
        AppCommand::Convert { from, to, value } => {
            cli::rates::convert(&app.service, &from, &to, &value).await
        }
        AppCommand::List => cli::rates::list(&app.service).await,
        AppCommand::Sync => cli::sync::sync_now(&app.synchronizer).await,
        AppCommand::Run => cli::sync::run(app.synchronizer, config.update_interval()).await,
    }
}
