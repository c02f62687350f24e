//! Errors returned by the core monitor.
//!
//! The error taxonomy follows the recovery policy:
//!
//! Error | Description | Recovery
//! ---|---|---
//! `Storage` | the shared store could not complete an operation | fatal, terminates the process
//! `MalformedEntry` | a stored value could not be decoded | fatal to the single operation only
//! `UnknownSwarm` | an info-hash has no record in the store | fatal to the single operation only
//!
//! Transient network failures (tracker scrape or DHT lookup) never surface
//! here: the orchestrator records them in the failure log and moves on.
use swarmwatch_primitives::info_hash::InfoHash;

use super::storage;

/// Error returned by the core monitor.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("store operation failed: {source}")]
    Storage {
        #[from]
        source: storage::error::Error,
    },

    #[error("stored entry `{key}` in `{collection}` is malformed: {source}")]
    MalformedEntry {
        collection: &'static str,
        key: String,
        source: serde_json::Error,
    },

    #[error("no record stored for swarm {info_hash}")]
    UnknownSwarm { info_hash: InfoHash },
}

impl Error {
    /// Whether the error must terminate the process instead of being
    /// swallowed by the current tick.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Storage { .. })
    }
}
