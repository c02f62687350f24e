//! In-process store driver.
//!
//! It keeps every collection in ordered in-memory structures, so map
//! iteration order is deterministic: lexicographic by key. Named locks are
//! plain `tokio` mutexes handed out as owned guards.
//!
//! This driver satisfies the whole [`Store`](crate::core::storage::Store)
//! contract for the workers inside one process. Coordinating workers across
//! processes requires a driver backed by a shared service.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::error::Error;
use super::{LockGuard, Store};

/// The in-process store.
#[derive(Default)]
pub struct Memory {
    maps: RwLock<BTreeMap<String, BTreeMap<String, String>>>,
    sets: RwLock<BTreeMap<String, BTreeSet<String>>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

#[async_trait]
impl Store for Memory {
    async fn map_get(&self, collection: &str, key: &str) -> Result<Option<String>, Error> {
        let maps = self.maps.read().await;

        Ok(maps.get(collection).and_then(|map| map.get(key).cloned()))
    }

    async fn map_set(&self, collection: &str, key: &str, value: &str) -> Result<(), Error> {
        let mut maps = self.maps.write().await;

        maps.entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());

        Ok(())
    }

    async fn map_get_all(&self, collection: &str) -> Result<Vec<(String, String)>, Error> {
        let maps = self.maps.read().await;

        Ok(maps
            .get(collection)
            .map(|map| map.iter().map(|(key, value)| (key.clone(), value.clone())).collect())
            .unwrap_or_default())
    }

    async fn map_keys(&self, collection: &str) -> Result<Vec<String>, Error> {
        let maps = self.maps.read().await;

        Ok(maps
            .get(collection)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_add(&self, set: &str, members: &[String]) -> Result<(), Error> {
        let mut sets = self.sets.write().await;

        let entries = sets.entry(set.to_string()).or_default();
        for member in members {
            entries.insert(member.clone());
        }

        Ok(())
    }

    async fn set_remove(&self, set: &str, members: &[String]) -> Result<(), Error> {
        let mut sets = self.sets.write().await;

        if let Some(entries) = sets.get_mut(set) {
            for member in members {
                entries.remove(member);
            }
        }

        Ok(())
    }

    async fn set_contains(&self, set: &str, member: &str) -> Result<bool, Error> {
        let sets = self.sets.read().await;

        Ok(sets.get(set).is_some_and(|entries| entries.contains(member)))
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, Error> {
        let sets = self.sets.read().await;

        Ok(sets
            .get(set)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn lock(&self, name: &str) -> Result<LockGuard, Error> {
        let mutex = {
            let mut locks = self.locks.lock().await;
            locks.entry(name.to_string()).or_default().clone()
        };

        let guard = mutex.lock_owned().await;

        Ok(LockGuard::new(guard))
    }
}
