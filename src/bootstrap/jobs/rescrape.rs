//! Job that runs the rescrape scheduler on intervals.
//!
//! Each tick rescrapes at most one stale, unclaimed swarm. Recoverable tick
//! failures are logged and the loop carries on; a fatal error (the store is
//! unreachable) terminates the process with a non-zero exit code so a
//! supervisor can restart it, instead of looping on a broken state.
//!
//! When `core.max_runtime` is set, the job shuts the process down cleanly
//! once the budget is spent, to support controlled recycling.
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::core::scheduler::TickOutcome;
use crate::core::Watcher;

/// It starts the job for the rescrape scheduler loop.
#[must_use]
pub fn start_job(config: &swarmwatch_configuration::Core, watcher: &Arc<Watcher>) -> JoinHandle<()> {
    let watcher = watcher.clone();
    let run_interval = config.run_interval;
    let max_runtime = config.max_runtime;

    tokio::spawn(async move {
        let started_at = tokio::time::Instant::now();

        let mut interval = tokio::time::interval(Duration::from_secs(run_interval));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopping rescrape scheduler job ...");
                    break;
                }
                _ = interval.tick() => {
                    if let Some(limit) = max_runtime {
                        if started_at.elapsed() >= Duration::from_secs(limit) {
                            info!("Run budget of {limit}s spent, recycling ...");
                            std::process::exit(0);
                        }
                    }

                    match watcher.scheduler.tick().await {
                        Ok(TickOutcome::Scraped { info_hash, persisted }) => {
                            if persisted {
                                info!("Rescraped {info_hash}");
                            } else {
                                info!("Rescraped {info_hash}, nothing new");
                            }
                        }
                        // The scheduler already logs these two outcomes.
                        Ok(TickOutcome::NothingToDo | TickOutcome::LostRace) => {}
                        Err(err) if err.is_fatal() => {
                            error!("Fatal error in the rescrape scheduler: {err}");
                            std::process::exit(1);
                        }
                        Err(err) => error!("Rescrape tick failed: {err}"),
                    }
                }
            }
        }
    })
}
