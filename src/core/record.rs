//! The data kept for each monitored swarm.
//!
//! A [`SwarmRecord`] is created by an external ingestion collaborator and
//! updated in place by the scrape orchestrator; the core never deletes one.
//! Records are strongly typed in memory and serialized to JSON at the store
//! boundary.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use swarmwatch_primitives::info_hash::InfoHash;
use url::Url;

/// Aggregate counts reported by one tracker scrape.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStats {
    /// Active peers serving a full copy (`complete` in scrape responses).
    pub seeders: i64,
    /// Active peers still downloading (`incomplete` in scrape responses).
    pub leechers: i64,
    /// Peers that have ever completed the download.
    pub completed: i64,
    /// When the counts were obtained, in unix seconds.
    pub scraped_at: u64,
}

/// Peer count observed through a DHT lookup.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhtStats {
    /// Number of distinct peer addresses seen during one lookup.
    pub peers: u64,
    /// When the lookup finished, in unix seconds.
    pub scraped_at: u64,
}

/// All the information the monitor keeps about one swarm.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SwarmRecord {
    /// The info-hash identifying the swarm. Immutable primary key.
    pub id: InfoHash,

    /// The announce URLs for the swarm, in insertion order, without
    /// duplicates. A record with no trackers is unusual but well formed: it
    /// can still go stale through its DHT data.
    #[serde(deserialize_with = "deserialize_trackers")]
    pub trackers: Vec<Url>,

    /// Last known counts per tracker. An absent entry means the tracker has
    /// never been scraped successfully.
    #[serde(default)]
    pub tracker_data: HashMap<Url, TrackerStats>,

    /// Last known DHT peer count. Absent means never looked up.
    #[serde(default)]
    pub dht_data: Option<DhtStats>,
}

impl SwarmRecord {
    /// Builds a record that has never been scraped. Duplicate announce URLs
    /// are dropped, keeping the first occurrence.
    #[must_use]
    pub fn new(id: InfoHash, trackers: Vec<Url>) -> Self {
        Self {
            id,
            trackers: dedup_trackers(trackers),
            tracker_data: HashMap::new(),
            dht_data: None,
        }
    }

    /// Appends an announce URL unless the record already lists it. Returns
    /// whether the record changed.
    pub fn add_tracker(&mut self, announce: Url) -> bool {
        if self.trackers.contains(&announce) {
            return false;
        }

        self.trackers.push(announce);
        true
    }
}

fn dedup_trackers(trackers: Vec<Url>) -> Vec<Url> {
    let mut seen: HashSet<Url> = HashSet::new();

    trackers.into_iter().filter(|tracker| seen.insert(tracker.clone())).collect()
}

fn deserialize_trackers<'de, D>(deserializer: D) -> Result<Vec<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    let trackers = Vec::<Url>::deserialize(deserializer)?;

    Ok(dedup_trackers(trackers))
}
