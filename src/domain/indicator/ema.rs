//! Exponential moving average.
//!
//! k = 2/(n+1), seeded with the first value, then EMA = v*k + EMA*(1-k).

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    ema: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Ema {
            period,
            k: 2.0 / (period as f64 + 1.0),
            ema: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    type Input = f64;

    fn update(&mut self, value: &f64) -> Option<f64> {
        let next = match self.ema {
            None => *value,
            Some(prev) => prev + self.k * (value - prev),
        };
        self.ema = Some(next);
        self.ema
    }

    fn value(&self) -> Option<f64> {
        self.ema
    }
}
