//! EMA crossover and MACD timing on the mean price of each period.
//!
//! Every completed period contributes its mean close to a short and a long
//! EMA. Without a trigger the regime is BULL while short > long. With a
//! trigger (MACD) a third EMA smooths the short - long difference and the
//! regime is BULL while the difference is above it.

use chrono::NaiveDate;

use crate::domain::indicator::{Ema, Indicator};
use crate::domain::periodicity::Periodicity;
use crate::domain::quote::Quote;
use crate::domain::report::Emitter;

use super::{BearBull, MarketTiming, Regime};

#[derive(Debug, Clone, PartialEq)]
pub struct EmaTimingConfig {
    pub periodicity: Periodicity,
    pub short_period: usize,
    pub long_period: usize,
    pub trigger_period: Option<usize>,
}

impl Default for EmaTimingConfig {
    fn default() -> Self {
        EmaTimingConfig {
            periodicity: Periodicity::Monthly,
            short_period: 3,
            long_period: 10,
            trigger_period: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmaMarketTiming {
    config: EmaTimingConfig,
    short: Ema,
    long: Ema,
    trigger: Option<Ema>,
    current_key: Option<(i32, u32)>,
    period_sum: f64,
    period_count: usize,
    periods_seen: usize,
    regime: Regime,
}

impl EmaMarketTiming {
    pub fn new(config: EmaTimingConfig) -> Self {
        EmaMarketTiming {
            short: Ema::new(config.short_period),
            long: Ema::new(config.long_period),
            trigger: config.trigger_period.map(Ema::new),
            current_key: None,
            period_sum: 0.0,
            period_count: 0,
            periods_seen: 0,
            regime: Regime::new(if config.trigger_period.is_some() {
                "MACD"
            } else {
                "EMA"
            }),
            config,
        }
    }

    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.regime.set_emitter(emitter);
        self
    }

    pub fn short_ema(&self) -> Option<f64> {
        self.short.value()
    }

    pub fn long_ema(&self) -> Option<f64> {
        self.long.value()
    }

    fn close_period(&mut self, instant: NaiveDate) {
        if self.period_count == 0 {
            return;
        }
        let mean = self.period_sum / self.period_count as f64;
        self.period_sum = 0.0;
        self.period_count = 0;
        self.periods_seen += 1;

        let (Some(short), Some(long)) = (self.short.update(&mean), self.long.update(&mean)) else {
            return;
        };
        let emitter = self.regime.emitter();
        emitter.emit("SHORT", short);
        emitter.emit("LONG", long);

        let difference = short - long;
        let signal = match self.trigger.as_mut() {
            Some(trigger) => trigger.update(&difference).unwrap_or(0.0),
            None => 0.0,
        };
        if self.periods_seen < self.config.long_period {
            return;
        }
        if difference > signal {
            self.regime.transition(instant, BearBull::Bull);
        } else if difference < signal {
            self.regime.transition(instant, BearBull::Bear);
        }
    }
}

impl MarketTiming for EmaMarketTiming {
    fn record(&mut self, instant: NaiveDate, quote: &Quote) {
        let key = self.config.periodicity.period_key(instant);
        if self.current_key.is_some_and(|k| k != key) {
            self.close_period(instant);
        }
        self.current_key = Some(key);
        self.period_sum += quote.close();
        self.period_count += 1;
        self.regime.report();
    }

    fn bear_bull(&self) -> BearBull {
        self.regime.status()
    }
}
