//! Setup for the main monitor application.
//!
//! The [`app::setup`] function returns the application configuration and the
//! core [`Watcher`](crate::core::Watcher) container, with logging
//! initialized. The [`jobs`] module contains the long-running tasks the
//! application spawns.
pub mod app;
pub mod config;
pub mod jobs;
pub mod logging;
