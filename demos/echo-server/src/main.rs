//! Echo server demo: serves the default `{"processed": ...}` handler until
//! interrupted.
//!
//! Run with: cargo run -p echo-server-demo [config.json]

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wirelink_runtime::{Harness, LinkConfig};
use wirelink_server::Listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("configs.json"), PathBuf::from);
    let config = LinkConfig::load(&config_path);
    tracing::info!(host = %config.host, port = config.port, "starting echo server");

    let listener = Arc::new(Listener::new(config.host.clone(), config.port));

    let mut harness = Harness::new();
    harness.register(listener);
    harness.run().await?;

    Ok(())
}
