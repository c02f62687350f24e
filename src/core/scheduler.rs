//! The rescrape scheduler.
//!
//! Each tick selects at most one swarm that is both stale and unclaimed,
//! claims it, runs the scrape orchestrator, persists the record when it was
//! mutated and releases the claim. Any number of processes can run this loop
//! against the same store: the claim set is the only coordination between
//! them, so no swarm is ever scraped by two workers at once.
//!
//! Selection is the first eligible record in the store's iteration order;
//! there is no priority scoring. With the in-memory driver that order is
//! lexicographic by info-hash; other drivers define their own.
use std::collections::HashSet;

use swarmwatch_clock::clock::Time;
use swarmwatch_primitives::info_hash::InfoHash;
use tracing::{debug, info};
use url::Url;

use super::claim::Claims;
use super::error::Error;
use super::record::SwarmRecord;
use super::repository::Repository;
use super::scrape::SwarmScraper;
use super::staleness;
use crate::CurrentClock;

/// What one scheduler tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A swarm was scraped; `persisted` tells whether its record changed.
    Scraped { info_hash: InfoHash, persisted: bool },
    /// No record is currently stale and unclaimed.
    NothingToDo,
    /// Another worker claimed the selected swarm first. An expected
    /// outcome, not an error.
    LostRace,
}

/// The per-tick driver. See the module documentation.
pub struct Scheduler {
    repository: Repository,
    claims: Claims,
    scraper: SwarmScraper,
    max_age: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new(repository: Repository, claims: Claims, scraper: SwarmScraper, max_age: u64) -> Self {
        Self {
            repository,
            claims,
            scraper,
            max_age,
        }
    }

    /// It runs one tick.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable. The claim taken by
    /// the tick is released on every exit path, including that one.
    pub async fn tick(&self) -> Result<TickOutcome, Error> {
        let ignored = self.repository.ignored_trackers().await?;
        let claimed = self.claims.claimed().await?;
        let now = CurrentClock::now_secs();

        let candidate = self
            .repository
            .all_swarms()
            .await?
            .into_iter()
            .find(|record| !claimed.contains(&record.id) && staleness::is_stale(record, &ignored, now, self.max_age));

        let Some(mut record) = candidate else {
            info!("No stale swarms to rescrape");
            return Ok(TickOutcome::NothingToDo);
        };

        if !self.claims.try_claim(&record.id).await? {
            debug!("Lost the claim race for {}", record.id);
            return Ok(TickOutcome::LostRace);
        }

        info!("Rescraping {}", record.id);

        let outcome = self.scrape_and_persist(&mut record, &ignored).await;

        // Release before propagating the scrape outcome, so the claim never
        // outlives the tick that took it.
        self.claims.release(&record.id).await?;

        let persisted = outcome?;

        Ok(TickOutcome::Scraped {
            info_hash: record.id,
            persisted,
        })
    }

    async fn scrape_and_persist(&self, record: &mut SwarmRecord, ignored: &HashSet<Url>) -> Result<bool, Error> {
        let mutated = self.scraper.scrape(record, ignored).await?;

        if mutated {
            self.repository.upsert_swarm(record).await?;
        }

        Ok(mutated)
    }
}
