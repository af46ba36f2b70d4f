//! Runtime configuration (flags with environment fallbacks).

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::feed::{coinbase::COINBASE_WS_URL, CoinbaseFeedConfig};
use crate::storage::DEFAULT_LINKED_THRESHOLD;

/// Window backing to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Array below the linked threshold, linked list at or above
    Auto,
    Array,
    Linked,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "vwap-engine")]
#[command(about = "Streams Coinbase matches and keeps a rolling VWAP per trading pair")]
pub struct AppConfig {
    /// Feed websocket URL
    #[arg(long, env = "WEBSOCKET_URL", default_value = COINBASE_WS_URL)]
    pub websocket_url: String,

    /// Trading pairs to subscribe to (comma-separated)
    #[arg(long, env = "TRADING_PAIRS", default_value = "BTC-USD,ETH-USD,ETH-BTC")]
    pub trading_pairs: String,

    /// Number of most recent trades in the VWAP window
    #[arg(long, env = "WINDOW_SIZE", default_value_t = 200)]
    pub window_size: usize,

    /// Capacity from which `auto` picks the linked-list window
    #[arg(long, env = "LINKED_THRESHOLD", default_value_t = DEFAULT_LINKED_THRESHOLD)]
    pub linked_threshold: usize,

    /// Window backing
    #[arg(long = "store", env = "VWAP_STORE", value_enum, default_value_t = StoreKind::Auto)]
    pub store_kind: StoreKind,

    /// Websocket handshake timeout in milliseconds
    #[arg(long, env = "HANDSHAKE_TIMEOUT_MS", default_value_t = 5_000)]
    pub handshake_timeout_ms: u64,

    /// Wait for the server's close frame on shutdown, in milliseconds
    #[arg(long, env = "CLOSE_TIMEOUT_MS", default_value_t = 2_000)]
    pub close_timeout_ms: u64,
}

impl AppConfig {
    /// Upper-cased, trimmed pairs with empty entries dropped.
    pub fn pairs(&self) -> Vec<String> {
        self.trading_pairs
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn feed_config(&self) -> CoinbaseFeedConfig {
        CoinbaseFeedConfig {
            url: self.websocket_url.clone(),
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
            close_timeout: Duration::from_millis(self.close_timeout_ms),
        }
    }
}
