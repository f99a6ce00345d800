pub mod disk;
pub mod memory;

use crate::core::clock::Clock;
use crate::core::config::{AppConfig, StoreConfig};
use crate::core::store::RateStore;
use anyhow::{Context, Result};
use disk::DiskRateStore;
use memory::MemoryRateStore;
use std::sync::Arc;
use tracing::info;

/// Opens the backend selected by `config`.
pub fn open_store(config: &StoreConfig, clock: Arc<dyn Clock>) -> Result<Arc<dyn RateStore>> {
    match config {
        StoreConfig::Memory => {
            info!("Using in-memory rate store; rates are lost on exit");
            Ok(Arc::new(MemoryRateStore::with_clock(clock)))
        }
        StoreConfig::Disk { path } => {
            let path = match path {
                Some(path) => path.clone(),
                None => AppConfig::default_data_path()?.join("store"),
            };
            let store = DiskRateStore::open_with_clock(&path, clock)
                .with_context(|| format!("Failed to open rate store at {}", path.display()))?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::SystemClock;
    use crate::core::clock::ManualClock;
    use crate::core::rate::{NewRate, Rate};
    use crate::error::Error;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_each_backend() {
        let dir = tempdir().unwrap();
        let configs = [
            StoreConfig::Memory,
            StoreConfig::Disk {
                path: Some(dir.path().to_path_buf()),
            },
        ];

        for config in configs {
            let store = open_store(&config, Arc::new(SystemClock)).unwrap();
            let rate = store
                .create(NewRate::new("USD", "RUB", 80.0, Utc::now()))
                .await
                .unwrap();
            assert_eq!(store.find(rate.id).await.unwrap(), rate, "{config:?}");
        }
    }

    /// Creates a duplicate pair, moves the older record away and back, and
    /// records what `find_by_currencies` answers after each step.
    async fn pair_lookups(store: &dyn RateStore, clock: &ManualClock) -> Vec<Option<u64>> {
        let lookup = |first: &'static str, second: &'static str| async move {
            match store.find_by_currencies(first, second).await {
                Ok(rate) => Some(rate.id),
                Err(Error::NotFound(_)) => None,
                Err(e) => panic!("lookup failed: {e}"),
            }
        };

        let older = store
            .create(NewRate::new("USD", "RUB", 80.0, clock.now()))
            .await
            .unwrap();
        store
            .create(NewRate::new("USD", "RUB", 81.0, clock.now()))
            .await
            .unwrap();
        let mut seen = vec![lookup("USD", "RUB").await];

        store
            .update(&Rate {
                second_currency: "KZT".into(),
                ..older.clone()
            })
            .await
            .unwrap();
        seen.push(lookup("USD", "RUB").await);
        seen.push(lookup("USD", "KZT").await);

        store.update(&older).await.unwrap();
        seen.push(lookup("USD", "RUB").await);
        seen.push(lookup("USD", "KZT").await);
        seen.push(lookup("RUB", "USD").await);
        seen
    }

    #[tokio::test]
    async fn test_backends_agree_on_pair_lookups() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));

        let memory = open_store(&StoreConfig::Memory, clock.clone()).unwrap();
        let disk = open_store(
            &StoreConfig::Disk {
                path: Some(dir.path().to_path_buf()),
            },
            clock.clone(),
        )
        .unwrap();

        let from_memory = pair_lookups(memory.as_ref(), &clock).await;
        let from_disk = pair_lookups(disk.as_ref(), &clock).await;

        assert_eq!(
            from_memory,
            vec![Some(1), Some(2), Some(1), Some(1), None, None]
        );
        assert_eq!(from_disk, from_memory);
    }
}
