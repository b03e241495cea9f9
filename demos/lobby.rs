//! # Example: lobby
//!
//! Runs a lobby host on the in-process broker with two simulated consoles.
//! Console `A` joins, `B` joins and flickers once, then both stay until the
//! round starts. Press Ctrl-C to stop.
//!
//! ```text
//! RUST_LOG=debug cargo run --example lobby
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use lobbyvisor::{Config, Host, MemoryBroker, Transport, TransportFactory};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env()?;
    let broker = MemoryBroker::from_config(&cfg);
    let mut host = Host::new(cfg, Arc::new(broker.clone()));

    let console = broker.client(None);
    tokio::spawn(async move {
        if let Err(e) = play(console).await {
            eprintln!("console failed: {e}");
        }
    });

    host.run_until_signal().await?;
    println!("lobby stopped gracefully");
    Ok(())
}

/// Simulated consoles sharing one client.
async fn play(console: Arc<dyn Transport>) -> anyhow::Result<()> {
    console.connect().await?;
    console
        .subscribe(
            "#",
            Arc::new(|topic: &str, payload: &str| {
                if topic == "start" || topic.ends_with("splash/text") {
                    println!("[console] {topic}: {payload}");
                }
            }),
        )
        .await?;

    // give the host time to subscribe
    tokio::time::sleep(Duration::from_millis(200)).await;

    console.publish("A/join", "1").await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    console.publish("B/join", "1").await?;
    tokio::time::sleep(Duration::from_millis(400)).await;
    console.publish("B/join", "0").await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    console.publish("B/join", "1").await?;

    tokio::time::sleep(Duration::from_secs(8)).await;
    console.publish("game/1/A/ready", "1").await?;
    Ok(())
}
