//! `BitTorrent` protocol clients.
//!
//! The core treats the wire protocols as external capabilities with a fixed
//! call contract; these modules are the production implementations:
//!
//! - [`tracker`]: scrape clients for UDP (BEP 15) and HTTP (BEP 48)
//!   trackers, dispatched by announce URL scheme.
//! - [`dht`]: a mainline DHT `get_peers` lookup (BEP 5) used to count the
//!   peers of a swarm without asking any tracker.
pub mod dht;
pub mod tracker;
