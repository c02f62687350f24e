//! Staleness predicates.
//!
//! These are pure functions of a swarm record, the current ignore set and
//! the current time: identical inputs always yield identical outputs, which
//! keeps the rescrape decision deterministic and directly testable.
//!
//! Data is stale when its age reaches `max_age`:
//! `now - scraped_at >= max_age`. Data that was never obtained is stale by
//! definition. An ignored tracker is never stale: it is skipped entirely, so
//! it cannot keep a swarm eligible for rescraping.
use std::collections::HashSet;

use url::Url;

use super::record::SwarmRecord;

/// Whether the record's DHT data is missing or too old.
#[must_use]
pub fn is_stale_dht(record: &SwarmRecord, now: u64, max_age: u64) -> bool {
    match &record.dht_data {
        None => true,
        Some(dht_data) => now.saturating_sub(dht_data.scraped_at) >= max_age,
    }
}

/// Whether the record's data for one tracker is missing or too old.
/// Trackers in the ignore set are never stale.
#[must_use]
pub fn is_stale_tracker(record: &SwarmRecord, tracker: &Url, ignored: &HashSet<Url>, now: u64, max_age: u64) -> bool {
    if ignored.contains(tracker) {
        return false;
    }

    match record.tracker_data.get(tracker) {
        None => true,
        Some(stats) => now.saturating_sub(stats.scraped_at) >= max_age,
    }
}

/// Whether any of the record's data sources is stale. A record with no
/// trackers can still be stale solely through its DHT data.
#[must_use]
pub fn is_stale(record: &SwarmRecord, ignored: &HashSet<Url>, now: u64, max_age: u64) -> bool {
    if is_stale_dht(record, now, max_age) {
        return true;
    }

    record
        .trackers
        .iter()
        .any(|tracker| is_stale_tracker(record, tracker, ignored, now, max_age))
}
