use crate::core::clock::{Clock, SystemClock};
use crate::core::rate::{NewRate, Rate, RateId};
use crate::core::store::RateStore;
use crate::core::validation::RateValidator;
use crate::error::{Error, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const RATES_PARTITION: &str = "rates";
const PAIRS_PARTITION: &str = "rate_pairs";
const META_PARTITION: &str = "meta";
const LAST_ID_KEY: &str = "last_id";

fn store_err(e: impl Display) -> Error {
    Error::Store(e.to_string())
}

fn pair_prefix(first: &str, second: &str) -> Vec<u8> {
    format!("{first}/{second}/").into_bytes()
}

fn id_key(id: RateId) -> Vec<u8> {
    // Big-endian so partition iteration follows id order
    id.to_be_bytes().to_vec()
}

/// Index entry for one record: `FIRST/SECOND/` followed by the id.
fn pair_key(rate: &Rate) -> Vec<u8> {
    let mut key = pair_prefix(&rate.first_currency, &rate.second_currency);
    key.extend_from_slice(&id_key(rate.id));
    key
}

fn decode_id(bytes: &[u8]) -> Result<RateId> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::Store(format!("corrupt rate id of {} bytes", bytes.len())))?;
    Ok(RateId::from_be_bytes(raw))
}

/// Rate store persisted with fjall.
///
/// Records live in the `rates` partition keyed by id, with a secondary
/// `rate_pairs` index holding one `FIRST/SECOND/<id>` entry per record, so
/// a prefix scan yields the ids of a pair oldest first. Each create or update
/// is a single atomic batch.
pub struct DiskRateStore {
    keyspace: Keyspace,
    rates: PartitionHandle,
    pairs: PartitionHandle,
    meta: PartitionHandle,
    // Serialises id allocation and index maintenance
    write_lock: Mutex<()>,
    validator: RateValidator,
}

impl DiskRateStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(store_err)?;

        let keyspace = fjall::Config::new(path.join("rates_db"))
            .open()
            .map_err(store_err)?;
        let rates = keyspace
            .open_partition(RATES_PARTITION, PartitionCreateOptions::default())
            .map_err(store_err)?;
        let pairs = keyspace
            .open_partition(PAIRS_PARTITION, PartitionCreateOptions::default())
            .map_err(store_err)?;
        let meta = keyspace
            .open_partition(META_PARTITION, PartitionCreateOptions::default())
            .map_err(store_err)?;
        debug!("Opened rate store at {}", path.display());

        Ok(Self {
            keyspace,
            rates,
            pairs,
            meta,
            write_lock: Mutex::new(()),
            validator: RateValidator::new(clock),
        })
    }

    fn last_id(&self) -> Result<RateId> {
        match self.meta.get(LAST_ID_KEY).map_err(store_err)? {
            Some(bytes) => decode_id(&bytes),
            None => Ok(0),
        }
    }

    fn load(&self, id: RateId) -> Result<Option<Rate>> {
        match self.rates.get(id_key(id)).map_err(store_err)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(store_err)?)),
            None => Ok(None),
        }
    }

    fn oldest_for_pair(&self, first: &str, second: &str) -> Result<Option<RateId>> {
        match self.pairs.prefix(pair_prefix(first, second)).next() {
            Some(item) => {
                let (_, value) = item.map_err(store_err)?;
                Ok(Some(decode_id(&value)?))
            }
            None => Ok(None),
        }
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(store_err)
    }
}

#[async_trait]
impl RateStore for DiskRateStore {
    async fn create(&self, rate: NewRate) -> Result<Rate> {
        self.validator.validate_new(&rate)?;

        let _guard = self.write_lock.lock().await;
        let rate = rate.with_id(self.last_id()? + 1);

        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.rates,
            id_key(rate.id),
            serde_json::to_vec(&rate).map_err(store_err)?,
        );
        batch.insert(&self.pairs, pair_key(&rate), id_key(rate.id));
        batch.insert(&self.meta, LAST_ID_KEY, id_key(rate.id));
        batch.commit().map_err(store_err)?;
        self.persist()?;

        debug!(id = rate.id, pair = %rate.pair(), "Stored new rate");
        Ok(rate)
    }

    async fn find(&self, id: RateId) -> Result<Rate> {
        self.load(id)?
            .ok_or_else(|| Error::NotFound(format!("rate {id}")))
    }

    async fn find_by_currencies(&self, first: &str, second: &str) -> Result<Rate> {
        let not_found = || Error::NotFound(format!("rate {first}-{second}"));
        let id = self
            .oldest_for_pair(first, second)?
            .ok_or_else(not_found)?;
        self.load(id)?.ok_or_else(not_found)
    }

    async fn find_all(&self) -> Result<Vec<Rate>> {
        self.rates
            .iter()
            .map(|item| {
                let (_, value) = item.map_err(store_err)?;
                serde_json::from_slice::<Rate>(&value).map_err(store_err)
            })
            .collect()
    }

    async fn update(&self, rate: &Rate) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let existing = self
            .load(rate.id)?
            .ok_or_else(|| Error::NotFound(format!("rate {}", rate.id)))?;
        self.validator.validate_rate(rate)?;

        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.rates,
            id_key(rate.id),
            serde_json::to_vec(rate).map_err(store_err)?,
        );

        let old_key = pair_key(&existing);
        let new_key = pair_key(rate);
        if old_key != new_key {
            batch.remove(&self.pairs, old_key);
            batch.insert(&self.pairs, new_key, id_key(rate.id));
        }
        batch.commit().map_err(store_err)?;
        self.persist()?;

        debug!(id = rate.id, pair = %rate.pair(), "Updated rate");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_disk_store_create_find() {
        let dir = tempdir().unwrap();
        let clock = clock();
        let store = DiskRateStore::open_with_clock(dir.path(), clock.clone()).unwrap();

        let created = store
            .create(NewRate::new("USD", "RUB", 121.41, clock.now()))
            .await
            .unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(store.find(created.id).await.unwrap(), created);

        let by_pair = store.find_by_currencies("USD", "RUB").await.unwrap();
        assert_eq!(by_pair, created);
        assert!(matches!(
            store.find_by_currencies("RUB", "USD").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_disk_store_rejects_invalid_rate() {
        let dir = tempdir().unwrap();
        let clock = clock();
        let store = DiskRateStore::open_with_clock(dir.path(), clock.clone()).unwrap();

        let result = store
            .create(NewRate::new("USD", "usd", 1.0, clock.now()))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disk_store_update() {
        let dir = tempdir().unwrap();
        let clock = clock();
        let store = DiskRateStore::open_with_clock(dir.path(), clock.clone()).unwrap();

        let created = store
            .create(NewRate::new("USD", "RUB", 80.0, clock.now()))
            .await
            .unwrap();
        clock.advance(Duration::minutes(5));
        store
            .update(&created.refreshed(85.0, clock.now()))
            .await
            .unwrap();

        let found = store.find_by_currencies("USD", "RUB").await.unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.value, 85.0);
        assert_eq!(found.last_update_time, clock.now());

        let ghost = NewRate::new("EUR", "RUB", 90.0, clock.now()).with_id(99);
        assert!(matches!(store.update(&ghost).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_disk_store_update_moves_pair_index() {
        let dir = tempdir().unwrap();
        let clock = clock();
        let store = DiskRateStore::open_with_clock(dir.path(), clock.clone()).unwrap();

        let created = store
            .create(NewRate::new("USD", "RUB", 80.0, clock.now()))
            .await
            .unwrap();
        let moved = Rate {
            second_currency: "KZT".into(),
            ..created.clone()
        };
        store.update(&moved).await.unwrap();

        assert!(store.find_by_currencies("USD", "RUB").await.is_err());
        assert_eq!(
            store.find_by_currencies("USD", "KZT").await.unwrap().id,
            created.id
        );
    }

    #[tokio::test]
    async fn test_disk_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let clock = clock();

        {
            let store = DiskRateStore::open_with_clock(dir.path(), clock.clone()).unwrap();
            for (first, second) in [("USD", "RUB"), ("EUR", "RUB")] {
                store
                    .create(NewRate::new(first, second, 1.5, clock.now()))
                    .await
                    .unwrap();
            }
        }

        let store = DiskRateStore::open_with_clock(dir.path(), clock.clone()).unwrap();
        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].pair(), "USD-RUB");
        assert_eq!(all[1].pair(), "EUR-RUB");

        // Ids keep counting after a reopen
        let third = store
            .create(NewRate::new("GBP", "RUB", 2.0, clock.now()))
            .await
            .unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_disk_store_duplicate_pair_resolves_to_oldest() {
        let dir = tempdir().unwrap();
        let clock = clock();
        let store = DiskRateStore::open_with_clock(dir.path(), clock.clone()).unwrap();

        let first = store
            .create(NewRate::new("USD", "RUB", 80.0, clock.now()))
            .await
            .unwrap();
        store
            .create(NewRate::new("USD", "RUB", 81.0, clock.now()))
            .await
            .unwrap();

        assert_eq!(store.find_all().await.unwrap().len(), 2);
        assert_eq!(
            store.find_by_currencies("USD", "RUB").await.unwrap().id,
            first.id
        );
    }

    #[tokio::test]
    async fn test_disk_store_moving_duplicate_keeps_pair_reachable() {
        let dir = tempdir().unwrap();
        let clock = clock();
        let store = DiskRateStore::open_with_clock(dir.path(), clock.clone()).unwrap();

        let first = store
            .create(NewRate::new("USD", "RUB", 80.0, clock.now()))
            .await
            .unwrap();
        let second = store
            .create(NewRate::new("USD", "RUB", 81.0, clock.now()))
            .await
            .unwrap();
        let kzt = store
            .create(NewRate::new("USD", "KZT", 450.0, clock.now()))
            .await
            .unwrap();

        // Off a shared pair: the remaining duplicate takes over
        store
            .update(&Rate {
                second_currency: "KZT".into(),
                ..first.clone()
            })
            .await
            .unwrap();
        assert_eq!(
            store.find_by_currencies("USD", "RUB").await.unwrap().id,
            second.id
        );
        assert_eq!(
            store.find_by_currencies("USD", "KZT").await.unwrap().id,
            first.id
        );

        // Back onto it: the oldest id wins again
        store.update(&first).await.unwrap();
        assert_eq!(
            store.find_by_currencies("USD", "RUB").await.unwrap().id,
            first.id
        );
        assert_eq!(
            store.find_by_currencies("USD", "KZT").await.unwrap().id,
            kzt.id
        );
    }
}
