//! True range and average true range.
//!
//! TR = max(prev_close, high) - min(prev_close, low); the first candle has
//! no previous close and uses high - low. ATR is the SMMA of TR.

use crate::domain::candlestick::Candlestick;

use super::{Indicator, Smma};

#[derive(Debug, Clone, Default)]
pub struct TrueRange {
    prev_close: Option<f64>,
    value: Option<f64>,
}

impl TrueRange {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Indicator for TrueRange {
    type Input = Candlestick;

    fn update(&mut self, candle: &Candlestick) -> Option<f64> {
        let tr = match self.prev_close {
            None => candle.high - candle.low,
            Some(prev) => candle.true_range(prev),
        };
        self.prev_close = Some(candle.close);
        self.value = Some(tr);
        self.value
    }

    fn value(&self) -> Option<f64> {
        self.value
    }
}

#[derive(Debug, Clone)]
pub struct Atr {
    true_range: TrueRange,
    smma: Smma,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Atr {
            true_range: TrueRange::new(),
            smma: Smma::new(period),
        }
    }

    pub fn period(&self) -> usize {
        self.smma.period()
    }

    pub fn true_range(&self) -> Option<f64> {
        self.true_range.value()
    }
}

impl Indicator for Atr {
    type Input = Candlestick;

    fn update(&mut self, candle: &Candlestick) -> Option<f64> {
        let tr = self.true_range.update(candle)?;
        self.smma.update(&tr)
    }

    fn value(&self) -> Option<f64> {
        self.smma.value()
    }
}
