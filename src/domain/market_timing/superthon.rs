//! Superthon timing: counts green candles over a trailing window of periods.
//!
//! Quotes are merged into one candle per period. Once the window holds
//! `periods` completed candles, magnitude = green count - periods/2. BEAR
//! turns BULL at magnitude >= threshold, BULL turns BEAR at
//! magnitude <= -threshold; in between the regime is kept.

use chrono::NaiveDate;
use std::collections::VecDeque;

use crate::domain::candlestick::Candlestick;
use crate::domain::periodicity::Periodicity;
use crate::domain::quote::Quote;
use crate::domain::report::Emitter;

use super::{BearBull, MarketTiming, Regime};

#[derive(Debug, Clone, PartialEq)]
pub struct SuperthonConfig {
    pub periodicity: Periodicity,
    pub periods: usize,
    pub threshold: f64,
}

impl Default for SuperthonConfig {
    fn default() -> Self {
        SuperthonConfig {
            periodicity: Periodicity::Monthly,
            periods: 12,
            threshold: 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuperthonMarketTiming {
    config: SuperthonConfig,
    current: Option<((i32, u32), Candlestick)>,
    window: VecDeque<Candlestick>,
    regime: Regime,
}

impl SuperthonMarketTiming {
    pub fn new(config: SuperthonConfig) -> Self {
        SuperthonMarketTiming {
            window: VecDeque::with_capacity(config.periods + 1),
            config,
            current: None,
            regime: Regime::new("Superthon"),
        }
    }

    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.regime.set_emitter(emitter);
        self
    }

    pub fn magnitude(&self) -> f64 {
        let green = self.window.iter().filter(|c| c.is_green()).count();
        green as f64 - self.config.periods as f64 / 2.0
    }

    fn close_period(&mut self, instant: NaiveDate, candle: Candlestick) {
        self.window.push_back(candle);
        while self.window.len() > self.config.periods {
            self.window.pop_front();
        }
        if self.window.len() < self.config.periods {
            return;
        }
        let magnitude = self.magnitude();
        self.regime.emitter().emit("MAGNITUDE", magnitude);
        match self.regime.status() {
            BearBull::Bear if magnitude >= self.config.threshold => {
                self.regime.transition(instant, BearBull::Bull);
            }
            BearBull::Bull if magnitude <= -self.config.threshold => {
                self.regime.transition(instant, BearBull::Bear);
            }
            _ => {}
        }
    }
}

impl MarketTiming for SuperthonMarketTiming {
    fn record(&mut self, instant: NaiveDate, quote: &Quote) {
        let key = self.config.periodicity.period_key(instant);
        self.current = match self.current.take() {
            Some((k, candle)) if k == key => Some((k, candle.merge(&quote.candle))),
            Some((_, finished)) => {
                self.close_period(instant, finished);
                Some((key, quote.candle))
            }
            None => Some((key, quote.candle)),
        };
        self.regime.report();
    }

    fn bear_bull(&self) -> BearBull {
        self.regime.status()
    }
}
