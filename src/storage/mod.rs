//! Windowed VWAP storage
//!
//! A store keeps the most recent `limit` trade events in FIFO order and a
//! per-instrument VWAP over them, updated in O(1) on every push.
//! Two backings share one contract:
//! - `ArrayWindow`: contiguous slots, cheap for small windows
//! - `LinkedWindow`: doubly linked list, no shifting for large windows
//!
//! Every operation, reads included, runs under the store's mutex, so reads
//! see a consistent window and cache.

pub mod aggregate;
pub mod array_store;
pub mod linked_store;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::models::TradeEvent;

pub use aggregate::{Accumulator, Aggregates};
pub use array_store::ArrayWindow;
pub use linked_store::LinkedWindow;

/// Windows at or above this capacity default to the linked backing.
pub const DEFAULT_LINKED_THRESHOLD: usize = 500;

/// Capability set shared by every window backing.
pub trait VwapStore: Send + Sync {
    /// Append an event, evicting the oldest one first when the window is full.
    fn push(&self, event: TradeEvent);

    /// Number of events currently held.
    fn size(&self) -> usize;

    /// Configured capacity.
    fn limit(&self) -> usize;

    /// Held events in insertion order.
    fn enumerate(&self) -> Vec<TradeEvent>;

    /// Cached VWAP for `instrument`, `0.0` if never observed.
    fn vwap_of(&self, instrument: &str) -> f64;

    fn vwap_snapshot(&self) -> HashMap<String, f64>;

    /// Which backing this is, for logs.
    fn kind(&self) -> &'static str;

    /// One-line rendering of the current VWAPs.
    fn summary(&self) -> String {
        format_vwaps(&self.vwap_snapshot())
    }
}

/// Pick a backing by capacity: array below `linked_threshold`, linked at or above.
pub fn new_store(limit: usize, linked_threshold: usize) -> Arc<dyn VwapStore> {
    if limit < linked_threshold {
        Arc::new(ArrayWindow::new(limit))
    } else {
        Arc::new(LinkedWindow::new(limit))
    }
}

/// Render `PAIR: VWAP | PAIR: VWAP`, ordered by instrument id so lines are stable.
pub fn format_vwaps(vwaps: &HashMap<String, f64>) -> String {
    let mut entries: Vec<(&String, &f64)> = vwaps.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(pair, vwap)| format!("{}: {}", pair, vwap))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Errors raised while building a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Seed collection does not fit in the window
    InvalidCapacity { seed: usize, limit: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity { seed, limit } => write!(
                f,
                "initial events exceed window capacity: {} > {}",
                seed, limit
            ),
        }
    }
}

impl std::error::Error for StoreError {}

pub(crate) fn check_seed(seed: usize, limit: usize) -> Result<(), StoreError> {
    if seed > limit {
        return Err(StoreError::InvalidCapacity { seed, limit });
    }
    Ok(())
}
