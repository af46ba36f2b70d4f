//! Application wiring: feed → parser → VWAP store → log.

pub mod config;
pub mod shutdown;

use std::{fmt, sync::Arc};

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::feed::{FeedMessage, TradeFeed};
use crate::models::TradeEvent;
use crate::storage::{self, ArrayWindow, LinkedWindow, VwapStore};

pub use config::{AppConfig, StoreKind};
pub use shutdown::wait_for_signal;

/// Build the window backing requested by the config.
pub fn build_store(config: &AppConfig) -> Arc<dyn VwapStore> {
    match config.store_kind {
        StoreKind::Auto => storage::new_store(config.window_size, config.linked_threshold),
        StoreKind::Array => Arc::new(ArrayWindow::new(config.window_size)),
        StoreKind::Linked => Arc::new(LinkedWindow::new(config.window_size)),
    }
}

/// Reasons a feed message cannot become a trade event
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    InvalidPrice(String),
    InvalidQuantity(String),
    NonPositiveQuantity(f64),
    MissingInstrument,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPrice(raw) => write!(f, "error parsing price {:?}", raw),
            Self::InvalidQuantity(raw) => write!(f, "error parsing quantity {:?}", raw),
            Self::NonPositiveQuantity(q) => write!(f, "quantity must be positive, got {}", q),
            Self::MissingInstrument => write!(f, "missing product id"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Convert a feed message into a trade event the store can take.
pub fn parse_trade(msg: &FeedMessage) -> Result<TradeEvent, ParseError> {
    let price = parse_finite(&msg.price).ok_or_else(|| ParseError::InvalidPrice(msg.price.clone()))?;
    let quantity =
        parse_finite(&msg.size).ok_or_else(|| ParseError::InvalidQuantity(msg.size.clone()))?;
    if quantity <= 0.0 {
        return Err(ParseError::NonPositiveQuantity(quantity));
    }
    if msg.product_id.trim().is_empty() {
        return Err(ParseError::MissingInstrument);
    }

    Ok(TradeEvent::new(price, quantity, msg.product_id.clone()))
}

#[inline]
fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Counts of what the run loop did with feed messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pushed: u64,
    pub skipped: u64,
    pub rejected: u64,
}

pub struct App {
    config: AppConfig,
    feed: Box<dyn TradeFeed>,
    store: Arc<dyn VwapStore>,
}

impl App {
    pub fn new(config: AppConfig, feed: Box<dyn TradeFeed>, store: Arc<dyn VwapStore>) -> Self {
        Self {
            config,
            feed,
            store,
        }
    }

    pub fn store(&self) -> Arc<dyn VwapStore> {
        self.store.clone()
    }

    /// Subscribe, then fold every trade into the store until the feed closes.
    pub async fn run(&mut self, shutdown: watch::Receiver<bool>) -> Result<RunSummary> {
        let pairs = self.config.pairs();
        self.feed
            .subscribe(&pairs)
            .await
            .context("failed to subscribe")?;

        info!(
            window = self.store.limit(),
            store = self.store.kind(),
            pairs = ?pairs,
            "🚀 VWAP engine running"
        );

        let mut messages = self.feed.read(shutdown);
        let mut summary = RunSummary::default();

        while let Some(msg) = messages.recv().await {
            if msg.is_error() {
                warn!(message = ?msg.message, "feed reported an error");
                summary.skipped += 1;
                continue;
            }
            if !msg.is_trade() || msg.price.is_empty() {
                debug!(kind = %msg.kind, "skipping non-trade message");
                summary.skipped += 1;
                continue;
            }

            match parse_trade(&msg) {
                Ok(event) => {
                    self.store.push(event);
                    summary.pushed += 1;
                    info!(vwaps = %self.store.summary(), "VWAPs");
                }
                Err(e) => {
                    warn!(error = %e, product = %msg.product_id, "dropping malformed trade");
                    summary.rejected += 1;
                }
            }
        }

        self.feed.close().await;
        info!(
            pushed = summary.pushed,
            skipped = summary.skipped,
            rejected = summary.rejected,
            "feed closed"
        );
        Ok(summary)
    }
}
