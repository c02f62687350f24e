//! Primitive types for Swarmwatch.
//!
//! These are the basic data structures shared by the Swarmwatch crates: the
//! torrent [`InfoHash`](crate::info_hash::InfoHash) used as the primary key
//! for swarm records, and the timestamp type used for all scrape and failure
//! bookkeeping.
use std::time::Duration;

pub mod info_hash;

/// Duration since the Unix Epoch.
pub type DurationSinceUnixEpoch = Duration;
