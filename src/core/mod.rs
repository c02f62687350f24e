//! The core monitor logic, independent of any delivery or transport layer.
//!
//! Swarmwatch keeps a collection of swarm records fresh by rescraping the
//! stale ones. Four parts interlock around one shared record store:
//!
//! - [`staleness`]: pure predicates deciding what is stale.
//! - [`scrape`]: the orchestrator refreshing one record from the DHT and its
//!   trackers, with partial-failure handling.
//! - [`claim`]: the cross-process guarantee that a swarm is scraped by at
//!   most one worker at a time.
//! - [`blacklist`]: the adaptive quarantine for chronically failing
//!   trackers.
//!
//! The [`scheduler`] drives them: each tick picks one stale unclaimed swarm,
//! claims it, scrapes it and persists the result. The blacklist manager runs
//! on its own independent timer. Everything meets in the store, which is
//! abstracted behind the [`storage::Store`] capability trait, with typed
//! access through the [`repository`].
//!
//! ```text
//! scheduler tick ──▶ claim ──▶ scrape ──▶ repository ──▶ store
//!                              │  ▲
//!                   staleness ─┘  └─ tracker / DHT clients
//!
//! blacklist cycle ──▶ repository ──▶ store      (own timer)
//! ```
//!
//! Higher layers (the jobs in [`bootstrap`](crate::bootstrap), the console
//! clients) only talk to the [`Watcher`] container and the services in
//! [`services`].
pub mod blacklist;
pub mod claim;
pub mod error;
pub mod record;
pub mod repository;
pub mod scheduler;
pub mod scrape;
pub mod services;
pub mod staleness;
pub mod storage;

use std::sync::Arc;

use swarmwatch_configuration::Configuration;

use self::blacklist::Blacklist;
use self::claim::Claims;
use self::repository::Repository;
use self::scheduler::Scheduler;
use self::scrape::{DhtSearcher, SwarmScraper, TrackerScraper};
use self::storage::Store;

/// The domain layer service container.
///
/// It wires the store, the protocol clients and the configuration into the
/// core components. Higher layers hold one `Watcher` in an `Arc` and share
/// it between the jobs.
pub struct Watcher {
    pub repository: Repository,
    pub claims: Claims,
    pub scraper: SwarmScraper,
    pub scheduler: Scheduler,
    pub blacklist: Blacklist,
    max_age: u64,
}

impl Watcher {
    #[must_use]
    pub fn new(
        config: &Configuration,
        store: Arc<dyn Store>,
        trackers: Arc<dyn TrackerScraper>,
        dht: Arc<dyn DhtSearcher>,
    ) -> Self {
        let repository = Repository::new(store.clone());
        let claims = Claims::new(store);

        let scraper = SwarmScraper::new(
            repository.clone(),
            trackers,
            dht,
            config.core.max_age,
            config.blacklist.error_age,
        );

        let scheduler = Scheduler::new(repository.clone(), claims.clone(), scraper.clone(), config.core.max_age);
        let blacklist = Blacklist::new(repository.clone(), &config.blacklist);

        Self {
            repository,
            claims,
            scraper,
            scheduler,
            blacklist,
            max_age: config.core.max_age,
        }
    }

    /// The staleness threshold the monitor runs with, in seconds.
    #[must_use]
    pub fn max_age(&self) -> u64 {
        self.max_age
    }
}
