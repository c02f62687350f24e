//! The application's long-running jobs.
//!
//! Each job is one spawned task owning a timer-driven loop:
//!
//! - [`rescrape`]: the scheduler loop, rescraping one stale swarm per tick.
//! - [`blacklist`]: the blacklist manager, on its own independent cadence.
//!
//! A loop awaits its own tick before asking the timer for the next one, and
//! missed ticks are skipped, so cycles of the same job never overlap within
//! one process. Both loops stop on `ctrl-c`.
pub mod blacklist;
pub mod rescrape;
