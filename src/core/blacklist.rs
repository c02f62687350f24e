//! The adaptive tracker blacklist.
//!
//! Each cycle reviews the per-tracker failure history and maintains the
//! ignore set with a two-sided policy:
//!
//! - A tracker is **added** when its recent failure count reaches
//!   `max_errors`. Every addition is recorded in the tracker's event log.
//! - A tracker is **removed** only when all three hold: it no longer
//!   qualifies, its recent failure count is below `min_errors`, and its
//!   exponential backoff has expired: `last_event + 2^event_count < now`.
//!
//! The band between `min_errors` and `max_errors` is a hysteresis zone where
//! nothing changes, so a borderline tracker does not oscillate in and out of
//! the ignore set. The backoff grows with the pruned event-log length, which
//! applies a longer quarantine to repeat offenders; a tracker with no
//! remaining events is immediately eligible.
//!
//! The whole cycle runs under the tracker-errors lock, serializing it with
//! the orchestrator's failure-log appends. Overlapping cycles within one
//! process cannot happen: the cycle runs in a single-owner job loop that
//! skips ticks while a cycle is still running.
use std::collections::{HashMap, HashSet};

use swarmwatch_clock::clock::Time;
use tracing::{debug, info};

use super::error::Error;
use super::repository::{prune_timestamps, Repository};
use crate::CurrentClock;

/// Base of the `base^event_count` backoff duration, in seconds.
pub const BACKOFF_BASE: u64 = 2;

/// What one blacklist cycle changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// The blacklist manager. See the module documentation.
pub struct Blacklist {
    repository: Repository,
    max_errors: usize,
    min_errors: usize,
    error_age: u64,
    event_age: u64,
}

impl Blacklist {
    #[must_use]
    pub fn new(repository: Repository, settings: &swarmwatch_configuration::Blacklist) -> Self {
        Self {
            repository,
            max_errors: settings.max_errors,
            min_errors: settings.min_errors,
            error_age: settings.error_age,
            event_age: settings.event_age,
        }
    }

    /// It runs one review cycle and returns what changed.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn run_cycle(&self) -> Result<CycleReport, Error> {
        let _guard = self.repository.lock_tracker_errors().await?;

        let now = CurrentClock::now_secs();

        // Prune the failure logs and find the trackers that currently
        // qualify for blacklisting.
        let mut failure_counts: HashMap<String, usize> = HashMap::new();
        let mut qualifying: Vec<String> = Vec::new();

        for (tracker, recorded) in self.repository.tracker_errors().await? {
            let pruned = prune_timestamps(&recorded, now, self.error_age);
            if pruned.len() != recorded.len() {
                debug!("Pruning failures for {tracker}");
                self.repository.set_tracker_errors(&tracker, &pruned).await?;
            }

            debug!("{tracker}: {} recent failures", pruned.len());

            if pruned.len() >= self.max_errors {
                qualifying.push(tracker.clone());
            }
            failure_counts.insert(tracker, pruned.len());
        }

        let ignored: HashSet<String> = self.repository.ignored_trackers_raw().await?;

        // Newly qualifying trackers get an event recorded at the moment they
        // become blacklisted; the event log drives the removal backoff.
        let mut additions: Vec<String> = Vec::new();
        for tracker in &qualifying {
            if ignored.contains(tracker) {
                continue;
            }

            let mut events = self.repository.ignore_events(tracker).await?;
            events.push(now);
            self.repository.set_ignore_events(tracker, &events).await?;

            additions.push(tracker.clone());
        }

        // Prune every event log to its own retention window.
        for (tracker, recorded) in self.repository.all_ignore_events().await? {
            let pruned = prune_timestamps(&recorded, now, self.event_age);
            if pruned.len() != recorded.len() {
                debug!("Pruning blacklist events for {tracker}");
                self.repository.set_ignore_events(&tracker, &pruned).await?;
            }
        }

        // A currently ignored tracker is let back in only when it does not
        // qualify, its failures are below the hysteresis floor and its
        // quarantine has expired.
        let mut ignored_in_order: Vec<&String> = ignored.iter().collect();
        ignored_in_order.sort();

        let mut removals: Vec<String> = Vec::new();
        for tracker in ignored_in_order {
            if qualifying.contains(tracker) {
                continue;
            }

            let failures = failure_counts.get(tracker).copied().unwrap_or(0);
            if failures >= self.min_errors {
                continue;
            }

            if !self.backoff_expired(tracker, now).await? {
                continue;
            }

            removals.push(tracker.clone());
        }

        if !additions.is_empty() {
            self.repository.add_ignored(&additions).await?;
            info!("Added {additions:?} to the tracker blacklist");
        }

        if !removals.is_empty() {
            self.repository.remove_ignored(&removals).await?;
            info!("Removed {removals:?} from the tracker blacklist");
        }

        debug!("Blacklist cycle done, added: {}, removed: {}", additions.len(), removals.len());

        Ok(CycleReport {
            added: additions,
            removed: removals,
        })
    }

    /// Whether a tracker's quarantine has expired:
    /// `last_event + 2^event_count < now`. A tracker with no remaining
    /// events was either never blacklisted or all its events have aged out;
    /// it is immediately eligible.
    async fn backoff_expired(&self, tracker: &str, now: u64) -> Result<bool, Error> {
        let events = self.repository.ignore_events(tracker).await?;

        let Some(last_event) = events.last().copied() else {
            return Ok(true);
        };

        let event_count = u32::try_from(events.len()).unwrap_or(u32::MAX);
        let backoff = BACKOFF_BASE.saturating_pow(event_count);

        Ok(last_event.saturating_add(backoff) < now)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use swarmwatch_clock::clock::stopped::Stopped as _;

    use super::Blacklist;
    use crate::core::repository::Repository;
    use crate::core::storage::memory::Memory;
    use crate::CurrentClock;

    const NOW: u64 = 1_000_000;

    const TRACKER: &str = "udp://tracker.example.com:1337/announce";

    fn settings() -> swarmwatch_configuration::Blacklist {
        swarmwatch_configuration::Blacklist {
            max_errors: 5,
            min_errors: 2,
            error_age: 86_400,
            event_age: 604_800,
            run_interval: 180,
        }
    }

    fn blacklist() -> (Blacklist, Repository) {
        let repository = Repository::new(Arc::new(Memory::default()));
        let blacklist = Blacklist::new(repository.clone(), &settings());

        (blacklist, repository)
    }

    fn set_now(now: u64) {
        CurrentClock::local_set(&Duration::from_secs(now));
    }

    async fn record_failures(repository: &Repository, tracker: &str, count: usize, at: u64) {
        let timestamps: Vec<u64> = vec![at; count];
        repository.set_tracker_errors(tracker, &timestamps).await.unwrap();
    }

    #[tokio::test]
    async fn a_tracker_reaching_max_errors_should_be_blacklisted_with_an_event() {
        set_now(NOW);
        let (blacklist, repository) = blacklist();

        record_failures(&repository, TRACKER, 5, NOW - 10).await;

        let report = blacklist.run_cycle().await.unwrap();

        assert_eq!(report.added, vec![TRACKER.to_string()]);
        assert!(repository.ignored_trackers_raw().await.unwrap().contains(TRACKER));
        assert_eq!(repository.ignore_events(TRACKER).await.unwrap(), vec![NOW]);
    }

    #[tokio::test]
    async fn a_tracker_below_max_errors_should_not_be_blacklisted() {
        set_now(NOW);
        let (blacklist, repository) = blacklist();

        record_failures(&repository, TRACKER, 4, NOW - 10).await;

        let report = blacklist.run_cycle().await.unwrap();

        assert!(report.added.is_empty());
        assert!(repository.ignored_trackers_raw().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn an_already_blacklisted_tracker_should_not_get_another_event() {
        set_now(NOW);
        let (blacklist, repository) = blacklist();

        record_failures(&repository, TRACKER, 5, NOW - 10).await;

        blacklist.run_cycle().await.unwrap();
        blacklist.run_cycle().await.unwrap();

        assert_eq!(repository.ignore_events(TRACKER).await.unwrap(), vec![NOW]);
    }

    #[tokio::test]
    async fn expired_failures_should_be_pruned_before_counting() {
        set_now(NOW);
        let (blacklist, repository) = blacklist();

        // All the failures are outside the retention window.
        record_failures(&repository, TRACKER, 5, NOW - 90_000).await;

        let report = blacklist.run_cycle().await.unwrap();

        assert!(report.added.is_empty());
        assert!(repository.tracker_errors().await.unwrap()[0].1.is_empty());
    }

    #[tokio::test]
    async fn a_tracker_inside_the_hysteresis_band_should_be_left_alone() {
        set_now(NOW);
        let (blacklist, repository) = blacklist();

        // Three failures: above min_errors (2), below max_errors (5).
        record_failures(&repository, TRACKER, 3, NOW - 10).await;
        repository.add_ignored(&[TRACKER.to_string()]).await.unwrap();
        // An old event, so the backoff alone would not block removal.
        repository.set_ignore_events(TRACKER, &[NOW - 1000]).await.unwrap();

        let report = blacklist.run_cycle().await.unwrap();

        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
        assert!(repository.ignored_trackers_raw().await.unwrap().contains(TRACKER));
    }

    #[tokio::test]
    async fn removal_should_wait_for_the_backoff_even_when_failures_are_gone() {
        let (blacklist, repository) = blacklist();

        // Blacklisted twice: event count 2 means a 4 second quarantine from
        // the last event.
        repository.add_ignored(&[TRACKER.to_string()]).await.unwrap();
        repository.set_ignore_events(TRACKER, &[NOW - 100, NOW]).await.unwrap();

        // 4 seconds later the quarantine (2^2 = 4s) has not yet expired:
        // removal requires last_event + backoff < now, strictly.
        set_now(NOW + 4);
        let report = blacklist.run_cycle().await.unwrap();
        assert!(report.removed.is_empty());

        set_now(NOW + 5);
        let report = blacklist.run_cycle().await.unwrap();
        assert_eq!(report.removed, vec![TRACKER.to_string()]);
        assert!(repository.ignored_trackers_raw().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn an_ignored_tracker_with_no_events_should_be_removed_immediately() {
        set_now(NOW);
        let (blacklist, repository) = blacklist();

        repository.add_ignored(&[TRACKER.to_string()]).await.unwrap();

        let report = blacklist.run_cycle().await.unwrap();

        assert_eq!(report.removed, vec![TRACKER.to_string()]);
    }

    #[tokio::test]
    async fn expired_events_should_shorten_the_quarantine_of_a_repeat_offender() {
        let (blacklist, repository) = blacklist();

        // Two events, but the first one is far outside the event retention
        // window: only one remains, so the backoff is 2^1 rather than 2^2.
        repository.add_ignored(&[TRACKER.to_string()]).await.unwrap();
        repository
            .set_ignore_events(TRACKER, &[NOW - 700_000, NOW])
            .await
            .unwrap();

        set_now(NOW + 3);
        let report = blacklist.run_cycle().await.unwrap();

        assert_eq!(report.removed, vec![TRACKER.to_string()]);
        assert_eq!(repository.ignore_events(TRACKER).await.unwrap(), vec![NOW]);
    }

    #[tokio::test]
    async fn a_qualifying_tracker_should_never_be_removed() {
        set_now(NOW);
        let (blacklist, repository) = blacklist();

        record_failures(&repository, TRACKER, 6, NOW - 10).await;
        repository.add_ignored(&[TRACKER.to_string()]).await.unwrap();

        let report = blacklist.run_cycle().await.unwrap();

        assert!(report.removed.is_empty());
    }
}
