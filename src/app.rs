//! Swarmwatch application.
//!
//! The application is a container for two long-running jobs sharing one
//! core service container:
//!
//! - The rescrape scheduler loop (see
//!   [`bootstrap::jobs::rescrape`](crate::bootstrap::jobs::rescrape)).
//! - The tracker blacklist manager (see
//!   [`bootstrap::jobs::blacklist`](crate::bootstrap::jobs::blacklist)).
//!
//! Any number of application instances can run against the same shared
//! store; the claim set keeps them from scraping the same swarm at once.
use std::sync::Arc;

use swarmwatch_configuration::Configuration;
use tokio::task::JoinHandle;

use crate::bootstrap::jobs::{blacklist, rescrape};
use crate::core::Watcher;

/// It starts the application jobs.
#[must_use]
pub fn start(config: &Configuration, watcher: &Arc<Watcher>) -> Vec<JoinHandle<()>> {
    vec![
        rescrape::start_job(&config.core, watcher),
        blacklist::start_job(&config.blacklist, watcher),
    ]
}
