//! Time related functions and types.
//!
//! It's usually a good idea to control where the time comes from in an
//! application so that it can be mocked for testing and we get the intended
//! behavior without relying on the underlying system time.
//!
//! Clocks return [`DurationSinceUnixEpoch`], a `std::time::Duration` since
//! the Unix Epoch (a timestamp that does not depend on the time zone).
//!
//! Consumer crates are expected to alias one of the two clocks:
//!
//! ```rust
//! use swarmwatch_clock::clock;
//!
//! #[cfg(not(test))]
//! pub type CurrentClock = clock::Working;
//!
//! #[cfg(test)]
//! pub type CurrentClock = clock::Stopped;
//! ```
pub mod clock;

/// Working version, for production.
#[cfg(not(test))]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Stopped;
