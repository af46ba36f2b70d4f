//! Coinbase websocket payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SUBSCRIBE: &str = "subscribe";
pub const MATCHES_CHANNEL: &str = "matches";

/// A channel entry in subscribe requests and subscription acks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_ids: Vec<String>,
}

/// Subscribe request sent right after connecting.
///
/// ```text
/// {"type":"subscribe","product_ids":["ETH-USD","BTC-USD"],"channels":[{"name":"matches"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub product_ids: Vec<String>,
    pub channels: Vec<Channel>,
}

impl SubscribeRequest {
    pub fn matches(product_ids: &[String]) -> Self {
        Self {
            kind: SUBSCRIBE.to_string(),
            product_ids: product_ids.to_vec(),
            channels: vec![Channel {
                name: MATCHES_CHANNEL.to_string(),
                product_ids: Vec::new(),
            }],
        }
    }
}

/// Any message the feed sends back. Trades arrive as `match` (and one
/// `last_match` per product right after subscribing); acks come as
/// `subscriptions`, failures as `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub product_id: String,
    /// Decimal string
    #[serde(default)]
    pub price: String,
    /// Decimal string
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub trade_id: u64,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<Channel>,
}

impl FeedMessage {
    pub fn is_trade(&self) -> bool {
        matches!(self.kind.as_str(), "match" | "last_match")
    }

    pub fn is_error(&self) -> bool {
        self.kind == "error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_json() {
        let req = SubscribeRequest::matches(&["BTC-USD".to_string()]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "subscribe",
                "product_ids": ["BTC-USD"],
                "channels": [{"name": "matches"}],
            })
        );
    }

    #[test]
    fn test_decode_match() {
        let raw = r#"{"type":"match","trade_id":341498074,"side":"sell","size":"0.0000299","price":"29303.35","product_id":"BTC-USD","time":"2022-05-21T09:12:04.862866Z"}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.is_trade());
        assert_eq!(msg.product_id, "BTC-USD");
        assert_eq!(msg.price, "29303.35");
        assert_eq!(msg.size, "0.0000299");
        assert_eq!(msg.trade_id, 341498074);
        assert!(msg.time.is_some());
    }

    #[test]
    fn test_decode_subscription_ack() {
        let raw = r#"{"type":"subscriptions","channels":[{"name":"matches","product_ids":["BTC-USD"]}]}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();
        assert!(!msg.is_trade());
        assert!(msg.price.is_empty());
        assert_eq!(msg.channels[0].product_ids, vec!["BTC-USD".to_string()]);
    }
}
