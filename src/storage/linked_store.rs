//! Linked-list VWAP window for large capacities.

use std::collections::{HashMap, LinkedList};
use std::fmt;

use parking_lot::Mutex;

use super::{check_seed, format_vwaps, Aggregates, StoreError, VwapStore};
use crate::models::TradeEvent;

#[derive(Debug)]
struct LinkedInner {
    events: LinkedList<TradeEvent>,
    limit: usize,
    aggregates: Aggregates,
}

impl LinkedInner {
    fn push(&mut self, event: TradeEvent) {
        if self.limit == 0 {
            self.aggregates.insert(&event);
            self.aggregates.evict(&event);
            return;
        }

        if self.events.len() == self.limit {
            if let Some(evicted) = self.events.pop_front() {
                self.aggregates.evict(&evicted);
            }
        }

        self.aggregates.insert(&event);
        self.events.push_back(event);
    }
}

/// FIFO window over a doubly linked list. Head removal never shifts the
/// remaining events and each node is freed as it leaves.
#[derive(Debug)]
pub struct LinkedWindow {
    inner: Mutex<LinkedInner>,
}

impl LinkedWindow {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Mutex::new(LinkedInner {
                events: LinkedList::new(),
                limit,
                aggregates: Aggregates::new(),
            }),
        }
    }

    pub fn with_seed(seed: Vec<TradeEvent>, limit: usize) -> Result<Self, StoreError> {
        check_seed(seed.len(), limit)?;
        let window = Self::new(limit);
        {
            let mut inner = window.inner.lock();
            for event in seed {
                inner.push(event);
            }
        }
        Ok(window)
    }

    /// Most recently pushed event still held.
    pub fn newest(&self) -> Option<TradeEvent> {
        self.inner.lock().events.back().cloned()
    }

    pub fn oldest(&self) -> Option<TradeEvent> {
        self.inner.lock().events.front().cloned()
    }
}

impl VwapStore for LinkedWindow {
    fn push(&self, event: TradeEvent) {
        self.inner.lock().push(event);
    }

    fn size(&self) -> usize {
        self.inner.lock().events.len()
    }

    fn limit(&self) -> usize {
        self.inner.lock().limit
    }

    fn enumerate(&self) -> Vec<TradeEvent> {
        self.inner.lock().events.iter().cloned().collect()
    }

    fn vwap_of(&self, instrument: &str) -> f64 {
        self.inner.lock().aggregates.vwap_of(instrument)
    }

    fn vwap_snapshot(&self) -> HashMap<String, f64> {
        self.inner.lock().aggregates.vwap_snapshot()
    }

    fn kind(&self) -> &'static str {
        "linked"
    }
}

impl fmt::Display for LinkedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_vwaps(&self.vwap_snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_with_limit() {
        let window = LinkedWindow::new(2);
        let p1 = TradeEvent::new(1.0, 1.0, "TradingPair1");
        let p2 = TradeEvent::new(2.0, 2.0, "TradingPair2");
        let p3 = TradeEvent::new(3.0, 3.0, "TradingPair1");

        window.push(p1.clone());
        assert_eq!(window.size(), 1);
        assert_eq!(window.newest(), Some(p1));

        window.push(p2.clone());
        assert_eq!(window.size(), 2);
        assert_eq!(window.newest(), Some(p2.clone()));

        window.push(p3.clone());
        assert_eq!(window.size(), 2);
        assert_eq!(window.newest(), Some(p3));
        assert_eq!(window.oldest(), Some(p2));
    }

    #[test]
    fn test_zero_limit_is_a_sink() {
        let window = LinkedWindow::new(0);
        window.push(TradeEvent::new(7.0, 2.0, "X"));
        window.push(TradeEvent::new(9.0, 1.0, "X"));

        assert_eq!(window.size(), 0);
        assert!(window.enumerate().is_empty());
        assert!(window.oldest().is_none());
    }

    #[test]
    fn test_seeded_window() {
        let seed = vec![
            TradeEvent::new(1.0, 1.0, "X"),
            TradeEvent::new(2.0, 2.0, "Y"),
        ];
        let window = LinkedWindow::with_seed(seed.clone(), 2).unwrap();
        assert_eq!(window.enumerate(), seed);
        assert_eq!(window.vwap_of("Y"), 2.0);

        assert!(LinkedWindow::with_seed(seed, 1).is_err());
    }
}
