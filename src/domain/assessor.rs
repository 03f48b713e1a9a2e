//! Per-instrument assessment used to rank an investible universe.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use super::indicator::{Atr, Indicator, Rsi, Sma};
use super::quote::Quote;

/// Tracks one instrument and decides whether, and how much of it, to hold.
pub trait QuoteAssessor {
    fn name(&self) -> &str;

    fn assess(&mut self, instant: NaiveDate, quote: &Quote);

    /// Samples needed before the assessment means anything; the longest of
    /// the underlying indicator windows.
    fn assessment_duration(&self) -> usize;

    fn is_assessed(&self) -> bool;

    fn is_eligible(&self) -> bool;

    /// Ranking score; higher ranks first.
    fn score(&self) -> f64;

    /// Whole parts to hold for a portfolio worth `nav`.
    fn parts_to_buy(&self, nav: f64) -> f64;

    /// Total order: higher score first, then by name.
    fn compare(&self, other: &dyn QuoteAssessor) -> Ordering {
        other
            .score()
            .total_cmp(&self.score())
            .then_with(|| self.name().cmp(other.name()))
    }
}

impl fmt::Debug for dyn QuoteAssessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuoteAssessor({}, score {})", self.name(), self.score())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumAssessorConfig {
    /// Trailing samples the momentum return is measured over.
    pub momentum_samples: usize,
    pub moving_average_samples: usize,
    pub atr_periods: usize,
    /// Largest tolerated close-to-close move inside the momentum window.
    pub max_gap: f64,
    /// Fraction of NAV risked per unit of ATR.
    pub risk_factor: f64,
    /// Ceiling on the value of one position as a fraction of NAV.
    pub max_position_fraction: f64,
    pub rsi_periods: usize,
    /// Instruments whose RSI exceeds this are overbought and ineligible.
    pub max_rsi: Option<f64>,
}

impl Default for MomentumAssessorConfig {
    fn default() -> Self {
        MomentumAssessorConfig {
            momentum_samples: 90,
            moving_average_samples: 100,
            atr_periods: 20,
            max_gap: 0.15,
            risk_factor: 0.001,
            max_position_fraction: 0.25,
            rsi_periods: 14,
            max_rsi: None,
        }
    }
}

/// Ranks by annualised return over a trailing window. Eligible while the
/// close is above its moving average and no gap in the window exceeds
/// `max_gap`, and below `max_rsi` when one is set. Sized by ATR risk, capped
/// by a share of NAV.
#[derive(Debug, Clone)]
pub struct MomentumAssessor {
    name: String,
    config: MomentumAssessorConfig,
    closes: VecDeque<(NaiveDate, f64)>,
    sma: Sma,
    atr: Atr,
    rsi: Rsi,
    samples: usize,
}

impl MomentumAssessor {
    pub fn new(name: impl Into<String>, config: MomentumAssessorConfig) -> Self {
        MomentumAssessor {
            name: name.into(),
            closes: VecDeque::with_capacity(config.momentum_samples + 2),
            sma: Sma::new(config.moving_average_samples),
            atr: Atr::new(config.atr_periods),
            rsi: Rsi::new(config.rsi_periods),
            samples: 0,
            config,
        }
    }

    fn last_close(&self) -> Option<f64> {
        self.closes.back().map(|&(_, c)| c)
    }

    /// Annualised return between the oldest and newest close in the window.
    pub fn momentum(&self) -> Option<f64> {
        if self.closes.len() <= self.config.momentum_samples {
            return None;
        }
        let (first_date, first) = *self.closes.front()?;
        let (last_date, last) = *self.closes.back()?;
        let days = (last_date - first_date).num_days();
        if days <= 0 {
            return None;
        }
        Some((last / first).powf(365.0 / days as f64) - 1.0)
    }

    pub fn rsi(&self) -> Option<f64> {
        self.rsi.value()
    }

    /// No moves at all leave RSI undefined, which is not overbought.
    fn is_overbought(&self) -> bool {
        match (self.config.max_rsi, self.rsi.value()) {
            (Some(max), Some(rsi)) => rsi > max,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn largest_gap(&self) -> f64 {
        self.closes
            .iter()
            .zip(self.closes.iter().skip(1))
            .map(|(&(_, prev), &(_, next))| (next / prev - 1.0).abs())
            .fold(0.0, f64::max)
    }
}

impl QuoteAssessor for MomentumAssessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn assess(&mut self, instant: NaiveDate, quote: &Quote) {
        let close = quote.close();
        self.closes.push_back((instant, close));
        while self.closes.len() > self.config.momentum_samples + 1 {
            self.closes.pop_front();
        }
        self.sma.update(&close);
        self.atr.update(&quote.candle);
        self.rsi.update(&close);
        self.samples += 1;
    }

    fn assessment_duration(&self) -> usize {
        let rsi = match self.config.max_rsi {
            Some(_) => self.config.rsi_periods + 1,
            None => 0,
        };
        (self.config.momentum_samples + 1)
            .max(self.config.moving_average_samples)
            .max(self.config.atr_periods)
            .max(rsi)
    }

    fn is_assessed(&self) -> bool {
        self.samples >= self.assessment_duration()
    }

    fn is_eligible(&self) -> bool {
        if !self.is_assessed() {
            return false;
        }
        let (Some(close), Some(average), Some(atr)) =
            (self.last_close(), self.sma.value(), self.atr.value())
        else {
            return false;
        };
        close >= average
            && atr > 0.0
            && self.largest_gap() <= self.config.max_gap
            && !self.is_overbought()
    }

    fn score(&self) -> f64 {
        self.momentum().unwrap_or(f64::NEG_INFINITY)
    }

    fn parts_to_buy(&self, nav: f64) -> f64 {
        let (Some(close), Some(atr)) = (self.last_close(), self.atr.value()) else {
            return 0.0;
        };
        let by_risk = (nav * self.config.risk_factor / atr).floor();
        let ceiling = (nav * self.config.max_position_fraction / close).floor();
        by_risk.min(ceiling).max(0.0)
    }
}
