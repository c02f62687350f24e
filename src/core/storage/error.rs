use std::panic::Location;

/// Error returned by a store driver.
///
/// Any driver error means the shared store could not complete an atomic
/// operation, which the core treats as fatal: there is no meaningful retry
/// inside a tick when the store is unreachable.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("the store is unavailable: {message}, {location}")]
    Unavailable {
        location: &'static Location<'static>,
        message: String,
    },
}
