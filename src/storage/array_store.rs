//! Array-backed VWAP window.
//!
//! Events live in a contiguous `Vec`. Eviction clears the head slot and
//! advances a logical start; the dead prefix is drained once it is at least
//! as long as the live part, which keeps eviction amortized O(1) and gives
//! the memory back.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::trace;

use super::{check_seed, format_vwaps, Aggregates, StoreError, VwapStore};
use crate::models::TradeEvent;

#[derive(Debug)]
struct ArrayInner {
    slots: Vec<Option<TradeEvent>>,
    /// Index of the oldest live slot
    head: usize,
    limit: usize,
    aggregates: Aggregates,
}

impl ArrayInner {
    #[inline]
    fn len(&self) -> usize {
        self.slots.len() - self.head
    }

    fn push(&mut self, event: TradeEvent) {
        if self.limit == 0 {
            // Nothing is ever retained; the event passes through the cache.
            self.aggregates.insert(&event);
            self.aggregates.evict(&event);
            return;
        }

        if self.len() == self.limit {
            self.evict_head();
        }

        self.aggregates.insert(&event);
        self.slots.push(Some(event));
    }

    fn evict_head(&mut self) {
        let Some(evicted) = self.slots.get_mut(self.head).and_then(Option::take) else {
            return;
        };
        self.head += 1;
        self.aggregates.evict(&evicted);

        if self.head >= self.len() {
            trace!(dead = self.head, live = self.len(), "compacting array window");
            self.slots.drain(..self.head);
            self.head = 0;
        }
    }
}

/// FIFO window over a contiguous buffer.
#[derive(Debug)]
pub struct ArrayWindow {
    inner: Mutex<ArrayInner>,
}

impl ArrayWindow {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Mutex::new(ArrayInner {
                slots: Vec::with_capacity(limit),
                head: 0,
                limit,
                aggregates: Aggregates::new(),
            }),
        }
    }

    /// Build a window pre-filled with `seed`, oldest first.
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

    /// Event at position `index` counted from the oldest held event.
    pub fn get(&self, index: usize) -> Option<TradeEvent> {
        let inner = self.inner.lock();
        inner
            .slots
            .get(inner.head + index)
            .and_then(|slot| slot.clone())
    }

    /// Allocated slots, live and dead. Never more than twice the live count
    /// plus one.
    pub fn allocated_slots(&self) -> usize {
        self.inner.lock().slots.len()
    }
}

impl VwapStore for ArrayWindow {
    fn push(&self, event: TradeEvent) {
        self.inner.lock().push(event);
    }

    fn size(&self) -> usize {
        self.inner.lock().len()
    }

    fn limit(&self) -> usize {
        self.inner.lock().limit
    }

    fn enumerate(&self) -> Vec<TradeEvent> {
        let inner = self.inner.lock();
        inner.slots[inner.head..].iter().flatten().cloned().collect()
    }

    fn vwap_of(&self, instrument: &str) -> f64 {
        self.inner.lock().aggregates.vwap_of(instrument)
    }

    fn vwap_snapshot(&self) -> HashMap<String, f64> {
        self.inner.lock().aggregates.vwap_snapshot()
    }

    fn kind(&self) -> &'static str {
        "array"
    }
}

impl fmt::Display for ArrayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_vwaps(&self.vwap_snapshot()))
    }
}
