//! The scrape orchestrator.
//!
//! One orchestrator run refreshes a single swarm record: a DHT peer-count
//! lookup when the DHT data is stale, then one scrape call per stale tracker.
//! The two are independent failure domains, and so is each tracker call: any
//! of them can fail without aborting the rest of the round. Failed trackers
//! are recorded in the failure log, which feeds the blacklist manager.
//!
//! The caller persists the record only when the run reports it was mutated.
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use swarmwatch_clock::clock::Time;
use swarmwatch_primitives::info_hash::InfoHash;
use tracing::{debug, error, info, warn};
use url::Url;

use super::error::Error;
use super::record::{DhtStats, SwarmRecord, TrackerStats};
use super::repository::Repository;
use super::staleness;
use crate::CurrentClock;

/// Aggregate counts returned by one tracker scrape call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerScrape {
    pub seeders: i64,
    pub leechers: i64,
    pub completed: i64,
}

/// Peer count returned by one DHT lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhtScrape {
    pub peers: u64,
}

/// A failed network scrape or lookup call. The orchestrator only records and
/// logs these, so the concrete cause is carried as text.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct ScrapeError {
    message: String,
}

impl ScrapeError {
    #[must_use]
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// Capability to scrape one tracker for one swarm. Implementations carry
/// their own externally configured timeout; a timed-out call is reported as
/// a failure like any other.
#[async_trait]
pub trait TrackerScraper: Send + Sync {
    async fn scrape(&self, info_hash: &InfoHash, announce: &Url) -> Result<TrackerScrape, ScrapeError>;
}

/// Capability to count the peers of one swarm through the DHT, bounded by an
/// externally configured timeout.
#[async_trait]
pub trait DhtSearcher: Send + Sync {
    async fn count_peers(&self, info_hash: &InfoHash) -> Result<DhtScrape, ScrapeError>;
}

/// The scrape orchestrator. See the module documentation.
#[derive(Clone)]
pub struct SwarmScraper {
    repository: Repository,
    trackers: Arc<dyn TrackerScraper>,
    dht: Arc<dyn DhtSearcher>,
    max_age: u64,
    error_age: u64,
}

impl SwarmScraper {
    #[must_use]
    pub fn new(
        repository: Repository,
        trackers: Arc<dyn TrackerScraper>,
        dht: Arc<dyn DhtSearcher>,
        max_age: u64,
        error_age: u64,
    ) -> Self {
        Self {
            repository,
            trackers,
            dht,
            max_age,
            error_age,
        }
    }

    /// It refreshes the stale parts of one swarm record in place and returns
    /// whether anything was written into the record.
    ///
    /// # Errors
    ///
    /// Will return an error if the failure log cannot be updated in the
    /// store. Network failures are recorded, not returned: the worst case is
    /// that the record stays stale and is retried next cycle.
    pub async fn scrape(&self, record: &mut SwarmRecord, ignored: &HashSet<Url>) -> Result<bool, Error> {
        let mut mutated = false;

        if record.trackers.is_empty() {
            warn!("Swarm {} has no trackers", record.id);
        }

        if staleness::is_stale_dht(record, CurrentClock::now_secs(), self.max_age) {
            match self.dht.count_peers(&record.id).await {
                Ok(scrape) => {
                    record.dht_data = Some(DhtStats {
                        peers: scrape.peers,
                        scraped_at: CurrentClock::now_secs(),
                    });
                    mutated = true;
                }
                Err(err) => error!("DHT lookup for {} failed: {err}", record.id),
            }
        } else {
            debug!("Skipping DHT lookup for {}", record.id);
        }

        let now = CurrentClock::now_secs();
        let stale_trackers: Vec<Url> = record
            .trackers
            .iter()
            .filter(|tracker| staleness::is_stale_tracker(record, tracker, ignored, now, self.max_age))
            .cloned()
            .collect();

        let mut failed: Vec<Url> = Vec::new();
        for announce in stale_trackers {
            debug!("Scraping tracker {announce} for {}", record.id);

            match self.trackers.scrape(&record.id, &announce).await {
                Ok(scrape) => {
                    record.tracker_data.insert(
                        announce,
                        TrackerStats {
                            seeders: scrape.seeders,
                            leechers: scrape.leechers,
                            completed: scrape.completed,
                            scraped_at: CurrentClock::now_secs(),
                        },
                    );
                    mutated = true;
                }
                Err(err) => {
                    warn!("Scraping tracker {announce} for {} failed: {err}", record.id);
                    failed.push(announce);
                }
            }
        }

        if !failed.is_empty() {
            let _guard = self.repository.lock_tracker_errors().await?;
            self.repository
                .append_tracker_errors(&failed, CurrentClock::now_secs(), self.error_age)
                .await?;
            info!("Recorded failures for trackers: {failed:?}");
        }

        info!("Finished scraping {}", record.id);

        Ok(mutated)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use swarmwatch_primitives::info_hash::InfoHash;
    use url::Url;

    use super::{DhtScrape, DhtSearcher, ScrapeError, TrackerScrape, TrackerScraper};

    /// A scripted tracker scraper: fails for the configured announce URLs
    /// and returns fixed counts for every other one.
    #[derive(Default)]
    pub struct ScriptedTrackerScraper {
        pub failing: HashSet<Url>,
        pub counts: TrackerScrape,
        pub calls: AtomicUsize,
    }

    impl Default for TrackerScrape {
        fn default() -> Self {
            Self {
                seeders: 5,
                leechers: 10,
                completed: 20,
            }
        }
    }

    #[async_trait]
    impl TrackerScraper for ScriptedTrackerScraper {
        async fn scrape(&self, _info_hash: &InfoHash, announce: &Url) -> Result<TrackerScrape, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.failing.contains(announce) {
                return Err(ScrapeError::new(format!("tracker {announce} is unreachable")));
            }

            Ok(self.counts)
        }
    }

    /// A scripted DHT searcher with a fixed peer count.
    pub struct ScriptedDhtSearcher {
        pub failing: bool,
        pub peers: u64,
        pub calls: AtomicUsize,
    }

    impl Default for ScriptedDhtSearcher {
        fn default() -> Self {
            Self {
                failing: false,
                peers: 42,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DhtSearcher for ScriptedDhtSearcher {
        async fn count_peers(&self, _info_hash: &InfoHash) -> Result<DhtScrape, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.failing {
                return Err(ScrapeError::new("no DHT nodes reachable".to_string()));
            }

            Ok(DhtScrape { peers: self.peers })
        }
    }
}
