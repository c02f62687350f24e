//! The shared record store.
//!
//! The monitor persists everything in one external key-value service that
//! offers atomic map and set operations plus named mutual-exclusion locks.
//! The service is abstracted behind the [`Store`] trait so any concrete
//! backend can be plugged in as a driver.
//!
//! There is currently one driver:
//!
//! - [`Memory`](crate::core::storage::memory::Memory): an in-process store,
//!   used as the reference implementation and by the test suite.
//!
//! Values are opaque strings to the store; the typed (de)serialization
//! happens at the [`repository`](crate::core::repository) boundary.
pub mod driver;
pub mod error;
pub mod memory;

use std::any::Any;

use async_trait::async_trait;

use self::error::Error;

/// Names of the store collections used by the monitor.
pub mod collections {
    /// Map of info-hash → serialized swarm record.
    pub const SWARMS: &str = "swarms";
    /// Map of announce URL → serialized failure timestamps.
    pub const TRACKER_ERRORS: &str = "tracker_errors";
    /// Set of announce URLs currently suppressed from scraping.
    pub const TRACKER_IGNORE: &str = "tracker_ignore";
    /// Map of announce URL → serialized blacklist event timestamps.
    pub const TRACKER_IGNORE_EVENTS: &str = "tracker_ignore_events";
    /// Set of info-hashes currently being scraped by some worker.
    pub const CLAIMS: &str = "claims";
}

/// Names of the store locks used by the monitor.
pub mod locks {
    /// Guards membership checks and mutations of the claim set.
    pub const CLAIMS: &str = "claims";
    /// Guards read-modify-write cycles on the failure and event logs.
    pub const TRACKER_ERRORS: &str = "tracker_errors";
}

/// An acquired named lock. The lock is held until the guard is dropped, so
/// it is released on every exit path, including early returns and panics.
pub struct LockGuard {
    _held: Box<dyn Any + Send>,
}

impl LockGuard {
    #[must_use]
    pub fn new(held: impl Any + Send) -> Self {
        Self { _held: Box::new(held) }
    }
}

/// The store capability trait. Every method maps to one atomic operation of
/// the backing service.
#[async_trait]
pub trait Store: Send + Sync {
    /// It returns the value stored under `key` in a map collection.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    async fn map_get(&self, collection: &str, key: &str) -> Result<Option<String>, Error>;

    /// It sets the value stored under `key` in a map collection.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    async fn map_set(&self, collection: &str, key: &str, value: &str) -> Result<(), Error>;

    /// It returns all the entries of a map collection, in the driver's
    /// iteration order. Drivers with a deterministic order document it; the
    /// scheduler's selection order follows from it.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    async fn map_get_all(&self, collection: &str) -> Result<Vec<(String, String)>, Error>;

    /// It returns the keys of a map collection, in the driver's iteration
    /// order.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    async fn map_keys(&self, collection: &str) -> Result<Vec<String>, Error>;

    /// It adds members to a set collection.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    async fn set_add(&self, set: &str, members: &[String]) -> Result<(), Error>;

    /// It removes members from a set collection.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    async fn set_remove(&self, set: &str, members: &[String]) -> Result<(), Error>;

    /// It tests a single member for set membership.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    async fn set_contains(&self, set: &str, member: &str) -> Result<bool, Error>;

    /// It returns all the members of a set collection.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    async fn set_members(&self, set: &str) -> Result<Vec<String>, Error>;

    /// It acquires the named lock, waiting until it is free.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    async fn lock(&self, name: &str) -> Result<LockGuard, Error>;
}
