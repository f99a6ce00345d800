use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "CURRENCY_API_KEY";

/// Upper bounds accepted by `AppConfig::check`.
pub const MAX_UPDATE_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
pub const MAX_TIMEOUT_SECS: u64 = 600;
pub const MAX_PACING_SECS: u64 = 24 * 60 * 60;

pub const DEFAULT_PROVIDER_URL: &str = "https://freecurrencyapi.net/api/v2";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Volatile storage, lost when the process exits.
    Memory,
    /// Embedded on-disk storage. Defaults to the project data directory.
    Disk { path: Option<PathBuf> },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Disk { path: None }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_provider_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PacingConfig {
    None,
    FixedDelay {
        #[serde(default = "default_pacing_secs")]
        secs: u64,
    },
    TokenBucket { capacity: u32, refill_secs: u64 },
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig::FixedDelay {
            secs: default_pacing_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct SyncConfig {
    #[serde(default)]
    pub pacing: PacingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Minutes between synchronization ticks.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: default_log_level(),
            update_interval: default_update_interval(),
            store: StoreConfig::default(),
            provider: ProviderConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_update_interval() -> u64 {
    10
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_pacing_secs() -> u64 {
    5
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "ratekeeper", "ratekeeper")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "ratekeeper", "ratekeeper")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        let config = config.with_api_key_override(std::env::var(API_KEY_ENV).ok());
        config.check()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Replaces the configured API key with `key` when it is set and non-empty.
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            debug!("Using provider API key from {}", API_KEY_ENV);
            self.provider.api_key = key;
        }
        self
    }

    pub fn check(&self) -> Result<()> {
        if !(1..=MAX_UPDATE_INTERVAL_MINUTES).contains(&self.update_interval) {
            anyhow::bail!(
                "update_interval must be between 1 and {MAX_UPDATE_INTERVAL_MINUTES} minutes"
            );
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.provider.timeout_secs) {
            anyhow::bail!("provider.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}");
        }
        match self.sync.pacing {
            PacingConfig::None => {}
            PacingConfig::FixedDelay { secs } if secs > MAX_PACING_SECS => {
                anyhow::bail!("sync.pacing.secs must be at most {MAX_PACING_SECS}");
            }
            PacingConfig::FixedDelay { .. } => {}
            PacingConfig::TokenBucket { capacity: 0, .. } => {
                anyhow::bail!("sync.pacing.capacity must be positive");
            }
            PacingConfig::TokenBucket { refill_secs, .. } if refill_secs > MAX_PACING_SECS => {
                anyhow::bail!("sync.pacing.refill_secs must be at most {MAX_PACING_SECS}");
            }
            PacingConfig::TokenBucket { .. } => {}
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval.saturating_mul(60))
    }
}
