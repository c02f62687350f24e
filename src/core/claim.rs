//! The claim coordinator.
//!
//! A claim is advisory exclusive ownership of one swarm hash for the
//! duration of one scrape. The claim set lives in the shared store, so the
//! guarantee holds across every worker process using it: concurrent
//! `try_claim` calls for the same hash grant exactly one of them.
//!
//! The membership check and the insertion are atomic because both happen
//! under the store's named `claims` lock; the set primitive alone does not
//! provide that. The lock protects only the set itself: it is held for the
//! check-and-insert, never across scrape I/O.
//!
//! Claims are time-unbounded by design. A crashed worker leaves its hash
//! claimed until an operator intervenes (see the claims console client);
//! there is deliberately no lease expiry here.
use std::collections::HashSet;
use std::sync::Arc;

use swarmwatch_primitives::info_hash::InfoHash;
use tracing::info;

use super::error::Error;
use super::storage::{collections, locks, Store};

/// Coordinates at-most-one-worker-at-a-time access to each swarm hash.
#[derive(Clone)]
pub struct Claims {
    store: Arc<dyn Store>,
}

impl Claims {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// It tries to claim a hash. Returns whether the claim was granted;
    /// `false` means some other worker holds it.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn try_claim(&self, info_hash: &InfoHash) -> Result<bool, Error> {
        let member = info_hash.to_string();

        let _guard = self.store.lock(locks::CLAIMS).await?;

        if self.store.set_contains(collections::CLAIMS, &member).await? {
            return Ok(false);
        }

        self.store.set_add(collections::CLAIMS, &[member]).await?;

        Ok(true)
    }

    /// It releases a claim. Releasing a hash that is not claimed is a no-op,
    /// so release can run unconditionally on every exit path.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn release(&self, info_hash: &InfoHash) -> Result<(), Error> {
        let _guard = self.store.lock(locks::CLAIMS).await?;

        self.store.set_remove(collections::CLAIMS, &[info_hash.to_string()]).await?;

        Ok(())
    }

    /// The set of currently claimed hashes. Members that are not valid
    /// info-hashes are ignored.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn claimed(&self) -> Result<HashSet<InfoHash>, Error> {
        let members = self.store.set_members(collections::CLAIMS).await?;

        Ok(members.iter().filter_map(|member| member.parse().ok()).collect())
    }

    /// It removes the given hashes from the claim set in one pass under the
    /// lock. Operator tool for claims left behind by crashed workers.
    ///
    /// # Errors
    ///
    /// Will return an error if the store is unreachable.
    pub async fn prune(&self, info_hashes: &[InfoHash]) -> Result<(), Error> {
        if info_hashes.is_empty() {
            return Ok(());
        }

        let members: Vec<String> = info_hashes.iter().map(ToString::to_string).collect();

        let _guard = self.store.lock(locks::CLAIMS).await?;

        self.store.set_remove(collections::CLAIMS, &members).await?;

        info!("Removed stale claims: {members:?}");

        Ok(())
    }
}
