use swarmwatch::{app, bootstrap};
use tracing::info;

#[tokio::main]
async fn main() {
    let (config, watcher) = bootstrap::app::setup();

    let jobs = app::start(&config, &watcher);

    // handle the signals
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Swarmwatch shutting down ...");

            // Await for all jobs to shutdown
            futures::future::join_all(jobs).await;
            info!("Swarmwatch successfully shutdown.");
        }
    }
}
