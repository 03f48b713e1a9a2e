//! Relative Strength Index.
//!
//! Up-moves and down-moves are smoothed independently with SMMA;
//! RSI = 100 - 100 / (1 + avg_up / avg_down). With no down-moves the ratio is
//! infinite and RSI is 100; with no moves at all it is NaN.

use super::{Indicator, Smma};

#[derive(Debug, Clone)]
pub struct Rsi {
    prev: Option<f64>,
    up: Smma,
    down: Smma,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Rsi {
            prev: None,
            up: Smma::new(period),
            down: Smma::new(period),
        }
    }

    fn compute(&self) -> Option<f64> {
        let up = self.up.value()?;
        let down = self.down.value()?;
        Some(100.0 - 100.0 / (1.0 + up / down))
    }
}

impl Indicator for Rsi {
    type Input = f64;

    fn update(&mut self, close: &f64) -> Option<f64> {
        let prev = self.prev.replace(*close)?;
        let change = close - prev;
        self.up.update(&change.max(0.0));
        self.down.update(&(-change).max(0.0));
        self.compute()
    }

    fn value(&self) -> Option<f64> {
        self.compute()
    }
}
