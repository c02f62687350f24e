//! Modules with functionality shared between the daemon and the console
//! clients.
pub mod bit_torrent;
