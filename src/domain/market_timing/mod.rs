//! Market timing: two-state BULL/BEAR regime detectors.
//!
//! A detector is fed once per simulated instant through `record`, before
//! anyone reads `bear_bull`. Transitions are edge triggered: state only
//! changes when the detector's predicate flips.

pub mod double;
pub mod ema_timing;
pub mod multiple;
pub mod stop_loss;
pub mod superthon;

pub use double::DoubleMarketTiming;
pub use ema_timing::{EmaMarketTiming, EmaTimingConfig};
pub use multiple::MultipleMarketTiming;
pub use stop_loss::{StopLossConfig, StopLossMarketTiming};
pub use superthon::{SuperthonConfig, SuperthonMarketTiming};

use chrono::NaiveDate;
use log::info;
use std::fmt;

use crate::domain::quote::Quote;
use crate::domain::report::Emitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BearBull {
    Bull,
    Bear,
}

impl BearBull {
    pub fn is_bull(self) -> bool {
        self == BearBull::Bull
    }

    /// Numeric form used in reports.
    pub fn as_signal(self) -> f64 {
        match self {
            BearBull::Bull => 1.0,
            BearBull::Bear => -1.0,
        }
    }
}

impl fmt::Display for BearBull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BearBull::Bull => f.write_str("BULL"),
            BearBull::Bear => f.write_str("BEAR"),
        }
    }
}

/// A regime change observed at `instant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingEvent {
    pub instant: NaiveDate,
    pub status: BearBull,
}

pub trait MarketTiming {
    /// Feeds the quote of the timed instrument at `instant`.
    fn record(&mut self, instant: NaiveDate, quote: &Quote);

    fn bear_bull(&self) -> BearBull;

    /// Regime changes from the latest `record` not yet taken.
    fn take_events(&mut self) -> Vec<TimingEvent> {
        Vec::new()
    }
}

impl fmt::Debug for dyn MarketTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarketTiming({})", self.bear_bull())
    }
}

/// Timing that never leaves BULL; strategies without a detector use it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMarketTiming;

impl MarketTiming for NullMarketTiming {
    fn record(&mut self, _instant: NaiveDate, _quote: &Quote) {}

    fn bear_bull(&self) -> BearBull {
        BearBull::Bull
    }
}

/// Current regime plus its reporting; shared by the concrete detectors.
#[derive(Debug, Clone)]
pub(crate) struct Regime {
    kind: &'static str,
    status: BearBull,
    emitter: Emitter,
}

impl Regime {
    pub(crate) fn new(kind: &'static str) -> Self {
        Regime {
            kind,
            status: BearBull::Bull,
            emitter: Emitter::disabled(),
        }
    }

    pub(crate) fn status(&self) -> BearBull {
        self.status
    }

    pub(crate) fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub(crate) fn set_emitter(&mut self, emitter: Emitter) {
        self.emitter = emitter;
    }

    /// Moves to `status`; returns true on an actual change.
    pub(crate) fn transition(&mut self, instant: NaiveDate, status: BearBull) -> bool {
        if status == self.status {
            return false;
        }
        info!("{} timing: {} -> {} on {}", self.kind, self.status, status, instant);
        self.status = status;
        true
    }

    pub(crate) fn report(&self) {
        self.emitter.emit("STATUS", self.status.as_signal());
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::candlestick::Candlestick;

    pub fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 15).unwrap()
    }

    /// `count` monthly quotes starting January 2020, one per month.
    pub fn monthly_quotes(count: usize, rising: bool) -> Vec<(NaiveDate, Quote)> {
        (0..count)
            .map(|i| {
                let base = if rising {
                    100.0 + 10.0 * i as f64
                } else {
                    1000.0 - 10.0 * i as f64
                };
                let (open, close) = if rising {
                    (base, base + 5.0)
                } else {
                    (base, base - 5.0)
                };
                let date = month(2020 + (i / 12) as i32, (i % 12) as u32 + 1);
                (date, Quote::new("IDX", Candlestick::new(Some(open), None, None, close)))
            })
            .collect()
    }

    /// Detector whose regime is scripted by the test.
    #[derive(Debug)]
    pub struct Scripted {
        pub statuses: Vec<BearBull>,
        pub step: usize,
    }

    impl Scripted {
        pub fn new(statuses: &[BearBull]) -> Self {
            Scripted {
                statuses: statuses.to_vec(),
                step: 0,
            }
        }
    }

    impl MarketTiming for Scripted {
        fn record(&mut self, _instant: NaiveDate, _quote: &Quote) {
            self.step += 1;
        }

        fn bear_bull(&self) -> BearBull {
            match self.step {
                0 => BearBull::Bull,
                n => self.statuses[(n - 1).min(self.statuses.len() - 1)],
            }
        }
    }
}
