//! Job that runs the tracker blacklist manager on intervals.
//!
//! The cadence is independent of the scheduler tick; the two loops only
//! meet in the store, where the tracker-errors lock serializes them.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::core::Watcher;

/// It starts the job for the blacklist manager loop.
#[must_use]
pub fn start_job(config: &swarmwatch_configuration::Blacklist, watcher: &Arc<Watcher>) -> JoinHandle<()> {
    let watcher = watcher.clone();
    let run_interval = config.run_interval;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(run_interval));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopping tracker blacklist job ...");
                    break;
                }
                _ = interval.tick() => {
                    let start_time = Utc::now().time();

                    match watcher.blacklist.run_cycle().await {
                        Ok(report) => {
                            info!(
                                "Blacklist cycle done in {}ms, added: {}, removed: {}",
                                (Utc::now().time() - start_time).num_milliseconds(),
                                report.added.len(),
                                report.removed.len(),
                            );
                        }
                        Err(err) if err.is_fatal() => {
                            error!("Fatal error in the blacklist manager: {err}");
                            std::process::exit(1);
                        }
                        Err(err) => error!("Blacklist cycle failed: {err}"),
                    }
                }
            }
        }
    })
}
