//! Trade feed transport
//!
//! The engine never talks to the network itself. A `TradeFeed` subscribes to
//! trading pairs, streams decoded messages into a channel, and closes the
//! connection on request. `CoinbaseFeed` is the websocket implementation.

pub mod coinbase;
pub mod models;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

pub use coinbase::{CoinbaseFeed, CoinbaseFeedConfig, FeedStats, FeedStatsSnapshot};
pub use models::{Channel, FeedMessage, SubscribeRequest};

/// Source of raw trade messages.
#[async_trait]
pub trait TradeFeed: Send {
    /// Subscribe to the `matches` channel for `pairs`.
    async fn subscribe(&mut self, pairs: &[String]) -> Result<()>;

    /// Start streaming. The returned channel closes when the connection ends
    /// or once `shutdown` flips to `true` and the close handshake is done.
    fn read(&mut self, shutdown: watch::Receiver<bool>) -> mpsc::Receiver<FeedMessage>;

    /// Close the connection.
    async fn close(&mut self);
}
