use std::sync::Arc;

use swarmwatch_configuration::Driver;

use super::error::Error;
use super::memory::Memory;
use super::Store;

/// It builds a store driver from the configuration.
///
/// # Errors
///
/// Will return an error if the driver cannot reach its backing service.
/// The in-process driver cannot fail to build.
pub fn build(driver: Driver) -> Result<Arc<dyn Store>, Error> {
    match driver {
        Driver::Memory => Ok(Arc::new(Memory::default())),
    }
}
