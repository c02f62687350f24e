//! Operator-facing domain services on top of the core monitor.
//!
//! These are the entry points used by the console clients: scraping one
//! specific swarm on demand, reporting why a swarm is (or is not) stale, and
//! appending announce URLs to every stored record.
use serde::Serialize;
use swarmwatch_clock::clock::Time;
use swarmwatch_primitives::info_hash::InfoHash;
use tracing::{error, info};
use url::Url;

use super::error::Error;
use super::staleness;
use super::Watcher;
use crate::CurrentClock;

/// Result of an on-demand scrape of one swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescrapeOutcome {
    /// The swarm was scraped; `persisted` tells whether its record changed.
    Scraped { persisted: bool },
    /// Another worker holds the claim for this swarm.
    AlreadyClaimed,
}

/// It scrapes one specific swarm now, regardless of the scheduler's
/// selection order. The claim set is honored unless `bypass_claims` is set.
///
/// # Errors
///
/// Will return an error if the store is unreachable, if the hash has no
/// record, or if the stored record is malformed.
pub async fn scrape_one(watcher: &Watcher, info_hash: &InfoHash, bypass_claims: bool) -> Result<RescrapeOutcome, Error> {
    let claimed_here = if bypass_claims {
        info!("Bypassing the claim set for {info_hash}");
        false
    } else {
        if !watcher.claims.try_claim(info_hash).await? {
            error!("Swarm {info_hash} is already claimed");
            return Ok(RescrapeOutcome::AlreadyClaimed);
        }
        true
    };

    let outcome = scrape_and_persist(watcher, info_hash).await;

    if claimed_here {
        watcher.claims.release(info_hash).await?;
    }

    outcome
}

async fn scrape_and_persist(watcher: &Watcher, info_hash: &InfoHash) -> Result<RescrapeOutcome, Error> {
    let Some(mut record) = watcher.repository.swarm(info_hash).await? else {
        return Err(Error::UnknownSwarm { info_hash: *info_hash });
    };

    let ignored = watcher.repository.ignored_trackers().await?;

    let mutated = watcher.scraper.scrape(&mut record, &ignored).await?;

    if mutated {
        watcher.repository.upsert_swarm(&record).await?;
    }

    Ok(RescrapeOutcome::Scraped { persisted: mutated })
}

/// Staleness report for one tracker of a swarm.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TrackerStatus {
    pub announce: Url,
    pub stale: bool,
    pub last_scraped_at: Option<u64>,
    pub blacklisted: bool,
}

/// Staleness report for one swarm.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SwarmStatus {
    pub info_hash: InfoHash,
    pub stale: bool,
    pub stale_dht: bool,
    pub dht_peers: Option<u64>,
    pub dht_scraped_at: Option<u64>,
    pub trackers: Vec<TrackerStatus>,
}

/// It explains how the staleness evaluator currently sees one swarm.
///
/// # Errors
///
/// Will return an error if the store is unreachable, if the hash has no
/// record, or if the stored record is malformed.
pub async fn swarm_status(watcher: &Watcher, info_hash: &InfoHash) -> Result<SwarmStatus, Error> {
    let Some(record) = watcher.repository.swarm(info_hash).await? else {
        return Err(Error::UnknownSwarm { info_hash: *info_hash });
    };

    let ignored = watcher.repository.ignored_trackers().await?;
    let now = CurrentClock::now_secs();
    let max_age = watcher.max_age();

    let trackers = record
        .trackers
        .iter()
        .map(|announce| TrackerStatus {
            announce: announce.clone(),
            stale: staleness::is_stale_tracker(&record, announce, &ignored, now, max_age),
            last_scraped_at: record.tracker_data.get(announce).map(|stats| stats.scraped_at),
            blacklisted: ignored.contains(announce),
        })
        .collect();

    Ok(SwarmStatus {
        info_hash: record.id,
        stale: staleness::is_stale(&record, &ignored, now, max_age),
        stale_dht: staleness::is_stale_dht(&record, now, max_age),
        dht_peers: record.dht_data.map(|dht| dht.peers),
        dht_scraped_at: record.dht_data.map(|dht| dht.scraped_at),
        trackers,
    })
}

/// It appends announce URLs to every stored swarm record, skipping the ones
/// a record already lists. Returns how many additions were made across the
/// whole collection.
///
/// # Errors
///
/// Will return an error if the store is unreachable.
pub async fn append_trackers(watcher: &Watcher, announces: &[Url]) -> Result<usize, Error> {
    let mut added = 0;

    for mut record in watcher.repository.all_swarms().await? {
        let mut changed = false;

        for announce in announces {
            if record.add_tracker(announce.clone()) {
                added += 1;
                changed = true;
            }
        }

        if changed {
            watcher.repository.upsert_swarm(&record).await?;
        }
    }

    info!("Added {added} tracker entries");

    Ok(added)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;

    use swarmwatch_clock::clock::stopped::Stopped as _;
    use swarmwatch_configuration::Configuration;
    use swarmwatch_primitives::info_hash::InfoHash;
    use url::Url;

    use super::{append_trackers, scrape_one, swarm_status, RescrapeOutcome};
    use crate::core::error::Error;
    use crate::core::record::SwarmRecord;
    use crate::core::scrape::test_support::{ScriptedDhtSearcher, ScriptedTrackerScraper};
    use crate::core::storage::memory::Memory;
    use crate::core::Watcher;
    use crate::CurrentClock;

    const NOW: u64 = 1_000_000;

    fn sample_info_hash() -> InfoHash {
        InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap()
    }

    fn tracker(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    fn watcher() -> Watcher {
        Watcher::new(
            &Configuration::default(),
            Arc::new(Memory::default()),
            Arc::new(ScriptedTrackerScraper::default()),
            Arc::new(ScriptedDhtSearcher::default()),
        )
    }

    #[tokio::test]
    async fn scraping_an_unknown_swarm_should_be_an_error() {
        CurrentClock::local_set(&Duration::from_secs(NOW));
        let watcher = watcher();

        let result = scrape_one(&watcher, &sample_info_hash(), false).await;

        assert!(matches!(result, Err(Error::UnknownSwarm { .. })));
        // The claim taken for the attempt was released again.
        assert!(watcher.claims.claimed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scraping_one_swarm_should_persist_the_fresh_record() {
        CurrentClock::local_set(&Duration::from_secs(NOW));
        let watcher = watcher();

        let record = SwarmRecord::new(sample_info_hash(), vec![tracker("udp://tracker.example.com:1337/announce")]);
        watcher.repository.upsert_swarm(&record).await.unwrap();

        let outcome = scrape_one(&watcher, &sample_info_hash(), false).await.unwrap();

        assert_eq!(outcome, RescrapeOutcome::Scraped { persisted: true });

        let stored = watcher.repository.swarm(&sample_info_hash()).await.unwrap().unwrap();
        assert!(stored.dht_data.is_some());
    }

    #[tokio::test]
    async fn a_claimed_swarm_should_not_be_scraped_unless_bypassed() {
        CurrentClock::local_set(&Duration::from_secs(NOW));
        let watcher = watcher();

        let record = SwarmRecord::new(sample_info_hash(), vec![tracker("udp://tracker.example.com:1337/announce")]);
        watcher.repository.upsert_swarm(&record).await.unwrap();
        watcher.claims.try_claim(&sample_info_hash()).await.unwrap();

        let outcome = scrape_one(&watcher, &sample_info_hash(), false).await.unwrap();
        assert_eq!(outcome, RescrapeOutcome::AlreadyClaimed);

        let outcome = scrape_one(&watcher, &sample_info_hash(), true).await.unwrap();
        assert_eq!(outcome, RescrapeOutcome::Scraped { persisted: true });

        // Bypassing must not release a claim someone else holds.
        assert!(!watcher.claims.claimed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn the_status_report_should_name_the_stale_parts() {
        CurrentClock::local_set(&Duration::from_secs(NOW));
        let watcher = watcher();

        let announce = tracker("udp://tracker.example.com:1337/announce");
        let ignored_announce = tracker("udp://ignored.example.com:1337/announce");

        let record = SwarmRecord::new(sample_info_hash(), vec![announce.clone(), ignored_announce.clone()]);
        watcher.repository.upsert_swarm(&record).await.unwrap();
        watcher
            .repository
            .add_ignored(&[ignored_announce.as_str().to_string()])
            .await
            .unwrap();

        let status = swarm_status(&watcher, &sample_info_hash()).await.unwrap();

        assert!(status.stale);
        assert!(status.stale_dht);
        assert_eq!(status.dht_peers, None);
        assert_eq!(status.trackers.len(), 2);
        assert!(status.trackers[0].stale);
        assert!(!status.trackers[0].blacklisted);
        assert!(!status.trackers[1].stale);
        assert!(status.trackers[1].blacklisted);
    }

    #[tokio::test]
    async fn appending_trackers_should_update_only_records_missing_them() {
        CurrentClock::local_set(&Duration::from_secs(NOW));
        let watcher = watcher();

        let announce = tracker("udp://tracker.example.com:1337/announce");
        let extra = tracker("http://open.example.org/announce");

        watcher
            .repository
            .upsert_swarm(&SwarmRecord::new(sample_info_hash(), vec![announce.clone()]))
            .await
            .unwrap();
        watcher
            .repository
            .upsert_swarm(&SwarmRecord::new(
                InfoHash::from_str("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap(),
                vec![announce.clone(), extra.clone()],
            ))
            .await
            .unwrap();

        let added = append_trackers(&watcher, &[announce.clone(), extra.clone()]).await.unwrap();

        // Only the first record was missing the extra tracker.
        assert_eq!(added, 1);

        let first = watcher.repository.swarm(&sample_info_hash()).await.unwrap().unwrap();
        assert_eq!(first.trackers, vec![announce, extra]);
    }
}
