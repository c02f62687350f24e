//! End-to-end flow over the public API: records go in, the scheduler
//! rescrapes the stale ones one tick at a time, failures feed the blacklist
//! and the blacklist feeds back into staleness.
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use swarmwatch::core::record::SwarmRecord;
use swarmwatch::core::scheduler::TickOutcome;
use swarmwatch::core::scrape::{DhtScrape, DhtSearcher, ScrapeError, TrackerScrape, TrackerScraper};
use swarmwatch::core::services::{self, RescrapeOutcome};
use swarmwatch::core::storage::memory::Memory;
use swarmwatch::core::Watcher;
use swarmwatch_configuration::Configuration;
use swarmwatch_primitives::info_hash::InfoHash;
use url::Url;

/// Succeeds for every tracker except the configured ones.
#[derive(Default)]
struct FakeTrackerScraper {
    failing: HashSet<Url>,
    calls: AtomicUsize,
}

#[async_trait]
impl TrackerScraper for FakeTrackerScraper {
    async fn scrape(&self, _info_hash: &InfoHash, announce: &Url) -> Result<TrackerScrape, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(announce) {
            return Err(ScrapeError::new(format!("{announce} is down")));
        }

        Ok(TrackerScrape {
            seeders: 12,
            leechers: 34,
            completed: 56,
        })
    }
}

struct FakeDhtSearcher;

#[async_trait]
impl DhtSearcher for FakeDhtSearcher {
    async fn count_peers(&self, _info_hash: &InfoHash) -> Result<DhtScrape, ScrapeError> {
        Ok(DhtScrape { peers: 7 })
    }
}

fn info_hash(raw: &str) -> InfoHash {
    InfoHash::from_str(raw).unwrap()
}

fn tracker(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}

fn watcher_with(config: &Configuration, scraper: Arc<FakeTrackerScraper>) -> Watcher {
    Watcher::new(config, Arc::new(Memory::default()), scraper, Arc::new(FakeDhtSearcher))
}

#[tokio::test]
async fn the_scheduler_should_drain_the_stale_records_one_tick_at_a_time() {
    let watcher = watcher_with(&Configuration::default(), Arc::new(FakeTrackerScraper::default()));

    let first = info_hash("1111111111111111111111111111111111111111");
    let second = info_hash("2222222222222222222222222222222222222222");
    let announce = tracker("udp://tracker.example.com:1337/announce");

    watcher
        .repository
        .upsert_swarm(&SwarmRecord::new(first, vec![announce.clone()]))
        .await
        .unwrap();
    watcher
        .repository
        .upsert_swarm(&SwarmRecord::new(second, vec![announce.clone()]))
        .await
        .unwrap();

    // One swarm per tick, in store order.
    assert_eq!(
        watcher.scheduler.tick().await.unwrap(),
        TickOutcome::Scraped {
            info_hash: first,
            persisted: true
        }
    );
    assert_eq!(
        watcher.scheduler.tick().await.unwrap(),
        TickOutcome::Scraped {
            info_hash: second,
            persisted: true
        }
    );

    // Everything is fresh now.
    assert_eq!(watcher.scheduler.tick().await.unwrap(), TickOutcome::NothingToDo);

    let record = watcher.repository.swarm(&first).await.unwrap().unwrap();
    assert_eq!(record.dht_data.unwrap().peers, 7);
    assert_eq!(record.tracker_data.get(&announce).unwrap().seeders, 12);

    // No claims are left behind.
    assert!(watcher.claims.claimed().await.unwrap().is_empty());
}

#[tokio::test]
async fn a_failing_tracker_should_end_up_blacklisted_and_stop_holding_the_swarm_stale() {
    let mut config = Configuration::default();
    config.blacklist.max_errors = 2;

    let bad = tracker("udp://bad.example.com:1337/announce");
    let scraper = Arc::new(FakeTrackerScraper {
        failing: [bad.clone()].into_iter().collect(),
        ..FakeTrackerScraper::default()
    });
    let watcher = watcher_with(&config, scraper.clone());

    let swarm = info_hash("3333333333333333333333333333333333333333");
    watcher
        .repository
        .upsert_swarm(&SwarmRecord::new(swarm, vec![bad.clone()]))
        .await
        .unwrap();

    // Two ticks, two recorded failures; the bad tracker keeps the swarm
    // stale because nothing was ever written for it.
    assert!(matches!(
        watcher.scheduler.tick().await.unwrap(),
        TickOutcome::Scraped { persisted: true, .. }
    ));
    assert!(matches!(
        watcher.scheduler.tick().await.unwrap(),
        TickOutcome::Scraped { persisted: false, .. }
    ));

    let errors = watcher.repository.tracker_errors().await.unwrap();
    assert_eq!(errors[0].0, bad.as_str());
    assert_eq!(errors[0].1.len(), 2);

    // The blacklist cycle quarantines the tracker ...
    let report = watcher.blacklist.run_cycle().await.unwrap();
    assert_eq!(report.added, vec![bad.as_str().to_string()]);

    // ... so the swarm is no longer stale and the tracker is not scraped
    // again.
    let calls_before = scraper.calls.load(Ordering::SeqCst);
    assert_eq!(watcher.scheduler.tick().await.unwrap(), TickOutcome::NothingToDo);
    assert_eq!(scraper.calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn an_on_demand_scrape_should_update_the_record_and_release_its_claim() {
    let watcher = watcher_with(&Configuration::default(), Arc::new(FakeTrackerScraper::default()));

    let swarm = info_hash("4444444444444444444444444444444444444444");
    let announce = tracker("http://tracker.example.org/announce");

    watcher
        .repository
        .upsert_swarm(&SwarmRecord::new(swarm, vec![announce]))
        .await
        .unwrap();

    let outcome = services::scrape_one(&watcher, &swarm, false).await.unwrap();

    assert_eq!(outcome, RescrapeOutcome::Scraped { persisted: true });
    assert!(watcher.claims.claimed().await.unwrap().is_empty());

    let status = services::swarm_status(&watcher, &swarm).await.unwrap();
    assert!(!status.stale);
}
