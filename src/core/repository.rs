//! Typed access to the store collections.
//!
//! The store keeps opaque strings; this module is the single place where the
//! monitor's records and logs are (de)serialized. Methods never take named
//! locks on their own unless documented otherwise, so components can compose
//! them inside their own critical sections.
use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;
use url::Url;

use super::error::Error;
use super::record::SwarmRecord;
use super::storage::{collections, locks, LockGuard, Store};
use swarmwatch_primitives::info_hash::InfoHash;

/// Keeps the timestamps younger than the retention window. The boundary
/// follows the retention rule `timestamp + age > now`.
#[must_use]
pub fn prune_timestamps(timestamps: &[u64], now: u64, age: u64) -> Vec<u64> {
    timestamps
        .iter()
        .copied()
        .filter(|timestamp| timestamp.saturating_add(age) > now)
        .collect()
}

/// Typed facade over the shared store.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// It acquires the lock that guards every read-modify-write cycle on the
    /// failure and event logs.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn lock_tracker_errors(&self) -> Result<LockGuard, Error> {
        Ok(self.store.lock(locks::TRACKER_ERRORS).await?)
    }

    // Swarm records

    /// It loads one swarm record.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable or the stored value
    /// cannot be decoded.
    pub async fn swarm(&self, info_hash: &InfoHash) -> Result<Option<SwarmRecord>, Error> {
        let key = info_hash.to_string();

        let Some(value) = self.store.map_get(collections::SWARMS, &key).await? else {
            return Ok(None);
        };

        let record = serde_json::from_str(&value).map_err(|source| Error::MalformedEntry {
            collection: collections::SWARMS,
            key,
            source,
        })?;

        Ok(Some(record))
    }

    /// It loads every swarm record, in the store's iteration order. A record
    /// that cannot be decoded is logged and skipped, so one corrupt entry
    /// does not take the whole collection down with it.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn all_swarms(&self) -> Result<Vec<SwarmRecord>, Error> {
        let entries = self.store.map_get_all(collections::SWARMS).await?;

        let mut records = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match serde_json::from_str::<SwarmRecord>(&value) {
                Ok(record) => records.push(record),
                Err(err) => warn!("Skipping malformed swarm record `{key}`: {err}"),
            }
        }

        Ok(records)
    }

    /// It stores a swarm record under its info-hash.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    ///
    /// # Panics
    ///
    /// Will panic if the record cannot be serialized, which cannot happen for
    /// a well-formed record.
    pub async fn upsert_swarm(&self, record: &SwarmRecord) -> Result<(), Error> {
        let value = serde_json::to_string(record).expect("a swarm record should be JSON serializable");

        self.store
            .map_set(collections::SWARMS, &record.id.to_string(), &value)
            .await?;

        Ok(())
    }

    // Tracker ignore set

    /// It returns the announce URLs currently suppressed from scraping.
    /// Members that are not valid URLs are logged and skipped.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn ignored_trackers(&self) -> Result<HashSet<Url>, Error> {
        let members = self.store.set_members(collections::TRACKER_IGNORE).await?;

        let mut ignored = HashSet::with_capacity(members.len());
        for member in members {
            match Url::parse(&member) {
                Ok(url) => {
                    ignored.insert(url);
                }
                Err(err) => warn!("Skipping malformed ignored tracker `{member}`: {err}"),
            }
        }

        Ok(ignored)
    }

    /// The raw string form of the ignore set, as the blacklist manager
    /// tracks it.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn ignored_trackers_raw(&self) -> Result<HashSet<String>, Error> {
        Ok(self
            .store
            .set_members(collections::TRACKER_IGNORE)
            .await?
            .into_iter()
            .collect())
    }

    /// It adds trackers to the ignore set.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn add_ignored(&self, trackers: &[String]) -> Result<(), Error> {
        self.store.set_add(collections::TRACKER_IGNORE, trackers).await?;

        Ok(())
    }

    /// It removes trackers from the ignore set.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn remove_ignored(&self, trackers: &[String]) -> Result<(), Error> {
        self.store.set_remove(collections::TRACKER_IGNORE, trackers).await?;

        Ok(())
    }

    // Tracker failure log

    /// It returns every tracker failure log. A log that cannot be decoded is
    /// reported as empty; the next write repairs it.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn tracker_errors(&self) -> Result<Vec<(String, Vec<u64>)>, Error> {
        let entries = self.store.map_get_all(collections::TRACKER_ERRORS).await?;

        Ok(entries
            .into_iter()
            .map(|(tracker, value)| {
                let timestamps = decode_timestamps(collections::TRACKER_ERRORS, &tracker, &value);
                (tracker, timestamps)
            })
            .collect())
    }

    /// It overwrites the failure log of one tracker.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn set_tracker_errors(&self, tracker: &str, timestamps: &[u64]) -> Result<(), Error> {
        self.store
            .map_set(collections::TRACKER_ERRORS, tracker, &encode_timestamps(timestamps))
            .await?;

        Ok(())
    }

    /// It appends the current timestamp to each failed tracker's log,
    /// pruning entries outside the retention window on the way.
    ///
    /// The caller must hold the tracker-errors lock: this is a
    /// read-modify-write cycle on state shared with the blacklist manager.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn append_tracker_errors(&self, trackers: &[Url], now: u64, error_age: u64) -> Result<(), Error> {
        for tracker in trackers {
            let key = tracker.as_str();

            let recorded = match self.store.map_get(collections::TRACKER_ERRORS, key).await? {
                Some(value) => decode_timestamps(collections::TRACKER_ERRORS, key, &value),
                None => Vec::new(),
            };

            let mut timestamps = prune_timestamps(&recorded, now, error_age);
            timestamps.push(now);

            self.store
                .map_set(collections::TRACKER_ERRORS, key, &encode_timestamps(&timestamps))
                .await?;
        }

        Ok(())
    }

    // Blacklist event log

    /// It returns every blacklist event log. A log that cannot be decoded is
    /// reported as empty; the next write repairs it.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn all_ignore_events(&self) -> Result<Vec<(String, Vec<u64>)>, Error> {
        let entries = self.store.map_get_all(collections::TRACKER_IGNORE_EVENTS).await?;

        Ok(entries
            .into_iter()
            .map(|(tracker, value)| {
                let timestamps = decode_timestamps(collections::TRACKER_IGNORE_EVENTS, &tracker, &value);
                (tracker, timestamps)
            })
            .collect())
    }

    /// It returns the blacklist event log of one tracker. Absent or
    /// malformed logs read as empty.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn ignore_events(&self, tracker: &str) -> Result<Vec<u64>, Error> {
        let Some(value) = self.store.map_get(collections::TRACKER_IGNORE_EVENTS, tracker).await? else {
            return Ok(Vec::new());
        };

        Ok(decode_timestamps(collections::TRACKER_IGNORE_EVENTS, tracker, &value))
    }

    /// It overwrites the blacklist event log of one tracker.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn set_ignore_events(&self, tracker: &str, timestamps: &[u64]) -> Result<(), Error> {
        self.store
            .map_set(collections::TRACKER_IGNORE_EVENTS, tracker, &encode_timestamps(timestamps))
            .await?;

        Ok(())
    }
}

fn encode_timestamps(timestamps: &[u64]) -> String {
    serde_json::to_string(timestamps).expect("a timestamp list should be JSON serializable")
}

fn decode_timestamps(collection: &str, key: &str, value: &str) -> Vec<u64> {
    match serde_json::from_str(value) {
        Ok(timestamps) => timestamps,
        Err(err) => {
            warn!("Treating malformed log `{key}` in `{collection}` as empty: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use swarmwatch_primitives::info_hash::InfoHash;
    use url::Url;

    use super::{prune_timestamps, Repository};
    use crate::core::record::SwarmRecord;
    use crate::core::storage::memory::Memory;
    use crate::core::storage::{collections, Store};

    fn repository() -> Repository {
        Repository::new(Arc::new(Memory::default()))
    }

    fn sample_info_hash() -> InfoHash {
        InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap()
    }

    fn tracker(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn pruning_should_keep_timestamps_inside_the_retention_window() {
        // With age 100 at now 1000, a timestamp of 900 is exactly on the
        // boundary and is dropped; 901 survives.
        assert_eq!(prune_timestamps(&[899, 900, 901, 1000], 1000, 100), vec![901, 1000]);
    }

    #[tokio::test]
    async fn a_stored_swarm_record_should_round_trip() {
        let repository = repository();

        let record = SwarmRecord::new(sample_info_hash(), vec![tracker("udp://tracker.example.com:1337/announce")]);
        repository.upsert_swarm(&record).await.unwrap();

        let loaded = repository.swarm(&sample_info_hash()).await.unwrap();

        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn loading_a_malformed_swarm_record_should_be_an_error() {
        let store = Arc::new(Memory::default());
        store
            .map_set(collections::SWARMS, &sample_info_hash().to_string(), "{not json")
            .await
            .unwrap();

        let repository = Repository::new(store);

        assert!(repository.swarm(&sample_info_hash()).await.is_err());
    }

    #[tokio::test]
    async fn bulk_loading_should_skip_malformed_swarm_records() {
        let store = Arc::new(Memory::default());
        let repository = Repository::new(store.clone());

        let record = SwarmRecord::new(sample_info_hash(), vec![tracker("udp://tracker.example.com:1337/announce")]);
        repository.upsert_swarm(&record).await.unwrap();
        store.map_set(collections::SWARMS, "zzzz", "{not json").await.unwrap();

        let records = repository.all_swarms().await.unwrap();

        assert_eq!(records, vec![record]);
    }

    #[tokio::test]
    async fn appending_tracker_errors_should_prune_expired_entries() {
        let repository = repository();
        let announce = tracker("udp://tracker.example.com:1337/announce");

        repository.set_tracker_errors(announce.as_str(), &[1, 950]).await.unwrap();

        let _guard = repository.lock_tracker_errors().await.unwrap();
        repository.append_tracker_errors(&[announce.clone()], 1000, 100).await.unwrap();

        let errors = repository.tracker_errors().await.unwrap();
        assert_eq!(errors, vec![(announce.as_str().to_string(), vec![950, 1000])]);
    }

    #[tokio::test]
    async fn a_malformed_failure_log_should_read_as_empty() {
        let store = Arc::new(Memory::default());
        store
            .map_set(collections::TRACKER_ERRORS, "udp://tracker.example.com:1337/announce", "oops")
            .await
            .unwrap();

        let repository = Repository::new(store);

        let errors = repository.tracker_errors().await.unwrap();
        assert_eq!(
            errors,
            vec![("udp://tracker.example.com:1337/announce".to_string(), vec![])]
        );
    }

    #[tokio::test]
    async fn the_ignore_set_should_skip_unparsable_members() {
        let store = Arc::new(Memory::default());
        store
            .set_add(
                collections::TRACKER_IGNORE,
                &["udp://tracker.example.com:1337/announce".to_string(), "not a url".to_string()],
            )
            .await
            .unwrap();

        let repository = Repository::new(store);

        let ignored = repository.ignored_trackers().await.unwrap();

        assert_eq!(ignored.len(), 1);
        assert!(ignored.contains(&tracker("udp://tracker.example.com:1337/announce")));
    }
}
