use serde::{Deserialize, Serialize};

/// Record store configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct Store {
    /// The store driver to use.
    #[serde(default)]
    pub driver: Driver,
}

/// The available record store drivers.
///
/// The monitor talks to the store through a capability trait, so any shared
/// key-value service with atomic map/set operations and named locks can back
/// it. The in-process `memory` driver is the reference implementation; it
/// provides the full contract for a single process.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[default]
    Memory,
}
