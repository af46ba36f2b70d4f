//! VWAP Engine Library
//!
//! Rolling volume-weighted average price per trading pair over the last N
//! trades of a live feed.
//! - `storage`: the windowed aggregation core (array and linked backings)
//! - `feed`: websocket transport that delivers raw trade messages
//! - `app`: configuration, wiring and shutdown for the binary

pub mod app;
pub mod feed;
pub mod models;
pub mod storage;

pub use models::TradeEvent;
pub use storage::{ArrayWindow, LinkedWindow, StoreError, VwapStore};
