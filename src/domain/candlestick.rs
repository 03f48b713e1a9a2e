//! Open/high/low/close candle for one period.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candlestick {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candlestick {
    /// Builds a candle from possibly incomplete data. `open` defaults to
    /// `close`; `high`/`low` default to max/min of open and close.
    pub fn new(open: Option<f64>, high: Option<f64>, low: Option<f64>, close: f64) -> Self {
        let open = open.unwrap_or(close);
        Candlestick {
            open,
            high: high.unwrap_or_else(|| open.max(close)),
            low: low.unwrap_or_else(|| open.min(close)),
            close,
        }
    }

    pub fn from_close(close: f64) -> Self {
        Self::new(None, None, None, close)
    }

    /// Folds a later candle into this one, producing the candle of the
    /// combined period.
    pub fn merge(&self, later: &Candlestick) -> Candlestick {
        Candlestick {
            open: self.open,
            high: self.high.max(later.high),
            low: self.low.min(later.low),
            close: later.close,
        }
    }

    pub fn is_green(&self) -> bool {
        self.close > self.open
    }

    pub fn is_red(&self) -> bool {
        self.close < self.open
    }

    /// max(prev_close, high) - min(prev_close, low)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        prev_close.max(self.high) - prev_close.min(self.low)
    }
}
