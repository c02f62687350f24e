//! It bootstraps the application: configuration, logging and the core
//! service container.
use std::sync::Arc;
use std::time::Duration;

use swarmwatch_configuration::Configuration;

use crate::bootstrap;
use crate::core::storage;
use crate::core::Watcher;
use crate::shared::bit_torrent::{dht, tracker};

/// It loads the configuration and builds the core service container with
/// logging initialized.
#[must_use]
pub fn setup() -> (Arc<Configuration>, Arc<Watcher>) {
    let configuration = Arc::new(bootstrap::config::initialize_configuration());
    let watcher = initialize_with_configuration(&configuration);

    (configuration, watcher)
}

#[must_use]
pub fn initialize_with_configuration(configuration: &Arc<Configuration>) -> Arc<Watcher> {
    initialize_logging(configuration);
    Arc::new(initialize_watcher(configuration))
}

/// It builds the core service container: the store driver and the
/// tracker/DHT protocol clients wired into the [`Watcher`].
///
/// # Panics
///
/// Will panic if the store driver or the protocol clients cannot be built.
#[must_use]
pub fn initialize_watcher(config: &Configuration) -> Watcher {
    let store = storage::driver::build(config.store.driver).expect("the store driver should be buildable");

    let timeout = Duration::from_secs(config.network.scrape_timeout);

    let trackers = Arc::new(
        tracker::Client::new(timeout, config.network.bind_port).expect("the tracker scrape client should be buildable"),
    );
    let dht = Arc::new(dht::Client::new(
        config.network.dht_routers.clone(),
        timeout,
        config.network.bind_port,
    ));

    Watcher::new(config, store, trackers, dht)
}

pub fn initialize_logging(config: &Arc<Configuration>) {
    bootstrap::logging::setup(config);
}
