//! Per-instrument running sums backing the VWAP cache.
//!
//! All VWAP arithmetic lives here. Both window variants own one
//! `Aggregates` and feed it insertions and evictions; neither touches the
//! sums directly.

use std::collections::HashMap;

use crate::models::TradeEvent;

/// Running sums for a single instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    /// Σ(price × quantity)
    pub sum_pq: f64,
    /// Σ(quantity)
    pub sum_q: f64,
}

impl Accumulator {
    #[inline]
    fn add(&mut self, event: &TradeEvent) {
        self.sum_pq += event.notional();
        self.sum_q += event.quantity;
    }

    #[inline]
    fn sub(&mut self, event: &TradeEvent) {
        self.sum_pq -= event.notional();
        self.sum_q -= event.quantity;
    }

    #[inline]
    fn ratio(&self) -> f64 {
        self.sum_pq / self.sum_q
    }
}

/// Aggregate cache: accumulators plus the last computed VWAP per instrument.
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    sums: HashMap<String, Accumulator>,
    vwap: HashMap<String, f64>,
}

impl Aggregates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for an event entering the window.
    ///
    /// The VWAP is recomputed unconditionally. A zero quantity here yields
    /// NaN or infinity; callers filter those events before they reach a store.
    pub fn insert(&mut self, event: &TradeEvent) {
        let acc = self.sums.entry(event.instrument.clone()).or_default();
        acc.add(event);
        let vwap = acc.ratio();
        self.vwap.insert(event.instrument.clone(), vwap);
    }

    /// Account for an event leaving the window.
    ///
    /// When the remaining quantity is exactly zero the cached VWAP keeps its
    /// previous value.
    pub fn evict(&mut self, event: &TradeEvent) {
        let acc = self.sums.entry(event.instrument.clone()).or_default();
        acc.sub(event);
        if acc.sum_q != 0.0 {
            let vwap = acc.ratio();
            self.vwap.insert(event.instrument.clone(), vwap);
        }
    }

    /// Cached VWAP, `0.0` for an instrument never seen.
    pub fn vwap_of(&self, instrument: &str) -> f64 {
        self.vwap.get(instrument).copied().unwrap_or_default()
    }

    pub fn vwap_snapshot(&self) -> HashMap<String, f64> {
        self.vwap.clone()
    }

    pub fn accumulator(&self, instrument: &str) -> Option<Accumulator> {
        self.sums.get(instrument).copied()
    }
}
