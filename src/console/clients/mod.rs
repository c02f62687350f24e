//! Console clients for operating the monitor by hand: one-off scrapes,
//! staleness reports, claim-set recovery and bulk tracker additions.
pub mod app;
