//! VWAP Engine - rolling VWAP per trading pair from the Coinbase matches feed
//!
//! Environment (flags take precedence):
//!   WEBSOCKET_URL    - Feed URL (default: wss://ws-feed.exchange.coinbase.com)
//!   TRADING_PAIRS    - Comma-separated pairs (default: BTC-USD,ETH-USD,ETH-BTC)
//!   WINDOW_SIZE      - Trades per window (default: 200)
//!   LINKED_THRESHOLD - Window size from which the linked store is used (default: 500)
//!   VWAP_STORE       - auto | array | linked (default: auto)

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vwap_engine::{
    app::{build_store, wait_for_signal, App, AppConfig},
    feed::CoinbaseFeed,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = AppConfig::parse();

    info!(url = %config.websocket_url, "Feed");
    info!(pairs = ?config.pairs(), window = config.window_size, "Trading pairs");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_signal(shutdown_tx));

    let feed = CoinbaseFeed::connect(config.feed_config())
        .await
        .context("failed to connect to trade feed")?;
    let store = build_store(&config);

    let mut app = App::new(config, Box::new(feed), store);
    app.run(shutdown_rx).await?;

    info!("VWAP engine stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vwap_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    let _ = dotenv();

    // Also pick up the crate's own .env when launched from elsewhere.
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
