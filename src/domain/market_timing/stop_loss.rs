//! Trailing-stop timing on close - k * ATR.
//!
//! While BULL the floor `L1` only ratchets up; a close below it turns the
//! regime BEAR. While BEAR the floor follows the level down, and a level
//! rising above the floor turns the regime BULL again. Meant as a fast exit
//! signal combined with a slower detector.

use chrono::NaiveDate;

use crate::domain::indicator::{Atr, Indicator};
use crate::domain::quote::Quote;
use crate::domain::report::Emitter;

use super::{BearBull, MarketTiming, Regime};

#[derive(Debug, Clone, PartialEq)]
pub struct StopLossConfig {
    pub atr_periods: usize,
    pub multiplier: f64,
}

impl Default for StopLossConfig {
    fn default() -> Self {
        StopLossConfig {
            atr_periods: 14,
            multiplier: 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StopLossMarketTiming {
    config: StopLossConfig,
    atr: Atr,
    floor: Option<f64>,
    regime: Regime,
}

impl StopLossMarketTiming {
    pub fn new(config: StopLossConfig) -> Self {
        StopLossMarketTiming {
            atr: Atr::new(config.atr_periods),
            config,
            floor: None,
            regime: Regime::new("StopLoss"),
        }
    }

    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.regime.set_emitter(emitter);
        self
    }

    /// Current trailing floor `L1`.
    pub fn floor(&self) -> Option<f64> {
        self.floor
    }
}

impl MarketTiming for StopLossMarketTiming {
    fn record(&mut self, instant: NaiveDate, quote: &Quote) {
        let Some(atr) = self.atr.update(&quote.candle) else {
            return;
        };
        let close = quote.close();
        let level = close - self.config.multiplier * atr;

        let floor = match (self.regime.status(), self.floor) {
            (_, None) => level,
            (BearBull::Bull, Some(floor)) if close < floor => {
                self.regime.transition(instant, BearBull::Bear);
                level
            }
            (BearBull::Bull, Some(floor)) => floor.max(level),
            (BearBull::Bear, Some(floor)) if level > floor => {
                self.regime.transition(instant, BearBull::Bull);
                level
            }
            (BearBull::Bear, Some(_)) => level,
        };
        self.floor = Some(floor);

        let emitter = self.regime.emitter();
        emitter.emit("ATR", atr);
        emitter.emit("L1", floor);
        self.regime.report();
    }

    fn bear_bull(&self) -> BearBull {
        self.regime.status()
    }
}
