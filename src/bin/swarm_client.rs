//! Operator client for the monitor. See
//! [`swarmwatch::console::clients::app`].
use swarmwatch::console::clients::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
