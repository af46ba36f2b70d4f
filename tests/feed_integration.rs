//! Integration tests for the websocket feed.
//!
//! Each test runs a throwaway websocket server on 127.0.0.1 so nothing
//! touches the real exchange.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpListener,
    sync::{oneshot, watch},
};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use vwap_engine::feed::{CoinbaseFeed, CoinbaseFeedConfig, FeedMessage, TradeFeed};

const MATCH_1: &str = r#"{"type":"last_match","trade_id":341498073,"side":"buy","size":"0.00324023","price":"29303.34","product_id":"BTC-USD","time":"2022-05-21T09:12:02.350239Z"}"#;
const MATCH_2: &str = r#"{"type":"match","trade_id":341498074,"side":"sell","size":"0.0000299","price":"29303.35","product_id":"BTC-USD","time":"2022-05-21T09:12:04.862866Z"}"#;
const ACK: &str = r#"{"type":"subscriptions","channels":[{"name":"matches","product_ids":["BTC-USD"]}]}"#;

fn config_for(addr: std::net::SocketAddr) -> CoinbaseFeedConfig {
    CoinbaseFeedConfig {
        url: format!("ws://{}", addr),
        handshake_timeout: Duration::from_secs(2),
        close_timeout: Duration::from_millis(500),
    }
}

async fn collect(mut rx: tokio::sync::mpsc::Receiver<FeedMessage>) -> Vec<FeedMessage> {
    let mut out = Vec::new();
    while let Some(msg) = rx.recv().await {
        out.push(msg);
    }
    out
}

#[tokio::test]
async fn test_subscribe_and_read() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (sub_tx, sub_rx) = oneshot::channel::<serde_json::Value>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let Some(Ok(Message::Text(sub))) = ws.next().await else {
            panic!("expected subscribe request");
        };
        sub_tx.send(serde_json::from_str(&sub).unwrap()).unwrap();

        for frame in [ACK, MATCH_1, "not json", MATCH_2] {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        let _ = ws.close(None).await;
        while ws.next().await.is_some() {}
    });

    let mut feed = CoinbaseFeed::connect(config_for(addr)).await.unwrap();
    feed.subscribe(&["BTC-USD".to_string()]).await.unwrap();

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let rx = feed.read(shutdown_rx);
    let messages = tokio::time::timeout(Duration::from_secs(5), collect(rx))
        .await
        .expect("feed channel should close after server close");

    let sub = sub_rx.await.unwrap();
    assert_eq!(sub["type"], "subscribe");
    assert_eq!(sub["product_ids"], serde_json::json!(["BTC-USD"]));
    assert_eq!(sub["channels"][0]["name"], "matches");

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].kind, "subscriptions");
    assert!(messages[1].is_trade());
    assert_eq!(messages[1].price, "29303.34");
    assert_eq!(messages[2].kind, "match");
    assert_eq!(messages[2].product_id, "BTC-USD");

    let stats = feed.stats();
    assert_eq!(stats.messages_received, 4);
    assert_eq!(stats.messages_forwarded, 3);
    assert_eq!(stats.decode_errors, 1);

    feed.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_sends_close_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel::<bool>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _subscribe = ws.next().await;
        ws.send(Message::Text(MATCH_2.to_string())).await.unwrap();

        let mut saw_close = false;
        while let Some(msg) = ws.next().await {
            if let Ok(Message::Close(_)) = msg {
                saw_close = true;
            }
        }
        let _ = closed_tx.send(saw_close);
    });

    let mut feed = CoinbaseFeed::connect(config_for(addr)).await.unwrap();
    feed.subscribe(&["BTC-USD".to_string()]).await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut rx = feed.read(shutdown_rx);

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .expect("one trade before shutdown");
    assert_eq!(first.kind, "match");

    shutdown_tx.send(true).unwrap();
    let rest = tokio::time::timeout(Duration::from_secs(5), collect(rx))
        .await
        .expect("feed channel should close on shutdown");
    assert!(rest.is_empty());

    let saw_close = tokio::time::timeout(Duration::from_secs(5), closed_rx)
        .await
        .unwrap()
        .unwrap();
    assert!(saw_close);

    feed.close().await;
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = CoinbaseFeed::connect(config_for(addr)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_handshake_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept TCP but never answer the upgrade.
    let holder = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let config = CoinbaseFeedConfig {
        handshake_timeout: Duration::from_millis(200),
        ..config_for(addr)
    };
    let err = match CoinbaseFeed::connect(config).await {
        Ok(_) => panic!("handshake should time out"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("timed out"));

    holder.abort();
}

#[tokio::test]
async fn test_subscribe_after_read_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let mut feed = CoinbaseFeed::connect(config_for(addr)).await.unwrap();
    let (_tx, rx) = watch::channel(false);
    let _messages = feed.read(rx);

    assert!(feed.subscribe(&["BTC-USD".to_string()]).await.is_err());
    feed.close().await;
}
