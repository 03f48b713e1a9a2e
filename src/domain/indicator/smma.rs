//! Smoothed moving average (Wilder's smoothing).
//!
//! The first `n` values are averaged once the window fills, then
//! SMMA = v/n + SMMA*(1-1/n).

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Smma {
    period: usize,
    seed_sum: f64,
    seen: usize,
    smma: Option<f64>,
}

impl Smma {
    pub fn new(period: usize) -> Self {
        Smma {
            period: period.max(1),
            seed_sum: 0.0,
            seen: 0,
            smma: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Smma {
    type Input = f64;

    fn update(&mut self, value: &f64) -> Option<f64> {
        match self.smma {
            Some(prev) => {
                self.smma = Some(prev + (value - prev) / self.period as f64);
            }
            None => {
                self.seed_sum += value;
                self.seen += 1;
                if self.seen == self.period {
                    self.smma = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.smma
    }

    fn value(&self) -> Option<f64> {
        self.smma
    }
}
