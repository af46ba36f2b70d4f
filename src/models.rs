/// A single executed trade as seen by the VWAP engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub price: f64,
    pub quantity: f64,
    /// Trading pair, e.g. `BTC-USD`
    pub instrument: String,
}

impl TradeEvent {
    pub fn new(price: f64, quantity: f64, instrument: impl Into<String>) -> Self {
        Self {
            price,
            quantity,
            instrument: instrument.into(),
        }
    }

    /// price × quantity
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}
