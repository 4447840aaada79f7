//! Echo client demo: dials the echo server, sends each CLI argument as one
//! message, and prints the replies.
//!
//! Run with: cargo run -p echo-client-demo -- hello world

use std::path::Path;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wirelink_client::Dialer;
use wirelink_core::Message;
use wirelink_runtime::LinkConfig;
use wirelink_session::ConnectionState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = LinkConfig::load(Path::new("configs.json"));
    let dialer = Dialer::new(config.uri(), config.retry_policy());

    dialer.start().await;
    anyhow::ensure!(
        dialer.state().await == ConnectionState::Connected,
        "could not connect to {}",
        dialer.target()
    );

    let mut payloads: Vec<String> = std::env::args().skip(1).collect();
    if payloads.is_empty() {
        payloads.push("hello!!".to_owned());
    }

    for payload in payloads {
        dialer.send(Message::text(payload), None).await;
        match dialer
            .receive(Some(Duration::from_secs(5)))
            .await
            .into_message()
        {
            Some(reply) => println!("{reply}"),
            None => tracing::warn!("no reply within the timeout"),
        }
    }

    dialer.stop().await;
    Ok(())
}
