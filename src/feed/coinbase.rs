//! Coinbase websocket feed.
//!
//! Dials the exchange feed, sends one subscribe request for the `matches`
//! channel and forwards every decoded message to the consumer. On shutdown
//! it sends a normal-closure frame and waits briefly for the server's close
//! before dropping the socket.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, trace, warn};

use super::{
    models::{FeedMessage, SubscribeRequest},
    TradeFeed,
};

pub const COINBASE_WS_URL: &str = "wss://ws-feed.exchange.coinbase.com";

/// Buffered messages between the socket reader and the consumer
const CHANNEL_CAPACITY: usize = 1024;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

#[derive(Debug, Clone)]
pub struct CoinbaseFeedConfig {
    pub url: String,
    /// Upper bound on the websocket handshake
    pub handshake_timeout: Duration,
    /// How long to wait for the server's close frame on shutdown
    pub close_timeout: Duration,
}

impl Default for CoinbaseFeedConfig {
    fn default() -> Self {
        Self {
            url: COINBASE_WS_URL.to_string(),
            handshake_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(2),
        }
    }
}

/// Counters for the reader task
#[derive(Debug, Default)]
pub struct FeedStats {
    pub messages_received: AtomicU64,
    pub messages_forwarded: AtomicU64,
    pub decode_errors: AtomicU64,
    pub bytes_received: AtomicU64,
}

impl FeedStats {
    pub fn snapshot(&self) -> FeedStatsSnapshot {
        FeedStatsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_forwarded: self.messages_forwarded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FeedStatsSnapshot {
    pub messages_received: u64,
    pub messages_forwarded: u64,
    pub decode_errors: u64,
    pub bytes_received: u64,
}

pub struct CoinbaseFeed {
    config: CoinbaseFeedConfig,
    /// Held until `read` hands it to the reader task
    stream: Option<WsStream>,
    reader: Option<JoinHandle<()>>,
    stop_tx: watch::Sender<bool>,
    stats: Arc<FeedStats>,
}

impl CoinbaseFeed {
    /// Dial the feed. Fails if the handshake errors or does not finish in time.
    pub async fn connect(config: CoinbaseFeedConfig) -> Result<Self> {
        let (stream, resp) = tokio::time::timeout(
            config.handshake_timeout,
            connect_async(config.url.as_str()),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "websocket handshake with {} timed out after {:?}",
                config.url,
                config.handshake_timeout
            )
        })?
        .with_context(|| format!("error while creating websocket feed for {}", config.url))?;

        info!(url = %config.url, status = %resp.status(), "✅ Connected to trade feed");

        let (stop_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            stream: Some(stream),
            reader: None,
            stop_tx,
            stats: Arc::new(FeedStats::default()),
        })
    }

    pub fn stats(&self) -> FeedStatsSnapshot {
        self.stats.snapshot()
    }
}

#[async_trait]
impl TradeFeed for CoinbaseFeed {
    async fn subscribe(&mut self, pairs: &[String]) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            bail!("feed is already streaming; subscribe before read");
        };

        let request = SubscribeRequest::matches(pairs);
        let payload = serde_json::to_string(&request).context("encode subscribe request")?;
        stream
            .send(Message::Text(payload))
            .await
            .context("error writing JSON to subscribe")?;

        info!(pairs = ?pairs, "📡 Subscribed to matches channel");
        Ok(())
    }

    fn read(&mut self, shutdown: watch::Receiver<bool>) -> mpsc::Receiver<FeedMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let Some(stream) = self.stream.take() else {
            warn!("feed read requested without an open connection");
            return rx;
        };

        let reader = Reader {
            tx,
            shutdown,
            stop: self.stop_tx.subscribe(),
            stats: self.stats.clone(),
            close_timeout: self.config.close_timeout,
        };
        self.reader = Some(tokio::spawn(reader.run(stream)));
        rx
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            match stream.close(None).await {
                Ok(()) => info!("Feed connection closed successfully"),
                Err(e) => warn!(error = %e, "close error for feed"),
            }
            return;
        }

        let Some(reader) = self.reader.take() else {
            return;
        };

        let _ = self.stop_tx.send(true);
        // Reader needs at most close_timeout for the handshake; allow a bit more.
        let grace = self.config.close_timeout + Duration::from_millis(500);
        match tokio::time::timeout(grace, reader).await {
            Ok(Ok(())) => info!("Feed connection closed successfully"),
            Ok(Err(e)) => warn!(error = %e, "feed reader task failed"),
            Err(_) => warn!("feed reader did not stop in time; dropping connection"),
        }
    }
}

struct Reader {
    tx: mpsc::Sender<FeedMessage>,
    shutdown: watch::Receiver<bool>,
    stop: watch::Receiver<bool>,
    stats: Arc<FeedStats>,
    close_timeout: Duration,
}

impl Reader {
    async fn run(mut self, stream: WsStream) {
        let (mut write, mut read) = stream.split();

        let already_requested = *self.shutdown.borrow();
        if already_requested {
            close_gracefully(&mut write, &mut read, self.close_timeout).await;
            return;
        }

        let mut shutdown_open = true;

        loop {
            tokio::select! {
                changed = self.shutdown.changed(), if shutdown_open => {
                    if changed.is_err() {
                        // Nobody can signal shutdown anymore.
                        shutdown_open = false;
                    } else {
                        let requested = *self.shutdown.borrow();
                        if requested {
                            debug!("shutdown requested; closing feed");
                            close_gracefully(&mut write, &mut read, self.close_timeout).await;
                            return;
                        }
                    }
                }
                _ = self.stop.changed() => {
                    close_gracefully(&mut write, &mut read, self.close_timeout).await;
                    return;
                }
                ws_msg = read.next() => {
                    let Some(ws_msg) = ws_msg else {
                        debug!("feed stream ended");
                        return;
                    };

                    match ws_msg {
                        Ok(Message::Text(text)) => {
                            if !self.forward(&text).await {
                                debug!("feed consumer dropped; closing");
                                close_gracefully(&mut write, &mut read, self.close_timeout).await;
                                return;
                            }
                        }
                        Ok(Message::Ping(payload)) => {
                            let _ = write.send(Message::Pong(payload)).await;
                        }
                        Ok(Message::Close(frame)) => {
                            log_close(frame.as_ref());
                            return;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "read error for feed");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Decode and hand one text frame to the consumer. Returns `false` once
    /// the consumer is gone.
    async fn forward(&self, text: &str) -> bool {
        self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_received
            .fetch_add(text.len() as u64, Ordering::Relaxed);

        let msg = match serde_json::from_str::<FeedMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, "undecodable feed message");
                return true;
            }
        };

        trace!(kind = %msg.kind, product = %msg.product_id, "feed message");
        if self.tx.send(msg).await.is_err() {
            return false;
        }
        self.stats.messages_forwarded.fetch_add(1, Ordering::Relaxed);
        true
    }
}

/// Send a normal closure and wait up to `wait` for the peer's close frame.
async fn close_gracefully(write: &mut WsWrite, read: &mut WsRead, wait: Duration) {
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    };
    if let Err(e) = write.send(Message::Close(Some(frame))).await {
        warn!(error = %e, "error writing close message");
        return;
    }

    let peer_close = async {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Close(frame)) => {
                    log_close(frame.as_ref());
                    return;
                }
                Ok(_) => {}
                Err(_) => return,
            }
        }
    };

    if tokio::time::timeout(wait, peer_close).await.is_err() {
        warn!("timeout waiting for close message response");
    }
}

fn log_close(frame: Option<&CloseFrame<'_>>) {
    match frame {
        Some(f) if f.code != CloseCode::Normal => {
            warn!(code = %f.code, reason = %f.reason, "close error for feed")
        }
        Some(f) => info!(reason = %f.reason, "normal connection close for feed"),
        None => info!("normal connection close for feed"),
    }
}
