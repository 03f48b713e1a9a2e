//! Asymmetric combination of a bear detector and a bull detector.
//!
//! BULL turns BEAR only when the bear detector falls from BULL to BEAR.
//! BEAR turns BULL only when the bull detector rises from BEAR to BULL.

use chrono::NaiveDate;

use crate::domain::quote::Quote;
use crate::domain::report::Emitter;

use super::{BearBull, MarketTiming, Regime};

#[derive(Debug)]
pub struct DoubleMarketTiming {
    bear_detector: Box<dyn MarketTiming>,
    bull_detector: Box<dyn MarketTiming>,
    regime: Regime,
}

impl DoubleMarketTiming {
    pub fn new(bear_detector: Box<dyn MarketTiming>, bull_detector: Box<dyn MarketTiming>) -> Self {
        DoubleMarketTiming {
            bear_detector,
            bull_detector,
            regime: Regime::new("Double"),
        }
    }

    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.regime.set_emitter(emitter);
        self
    }
}

impl MarketTiming for DoubleMarketTiming {
    fn record(&mut self, instant: NaiveDate, quote: &Quote) {
        let bear_before = self.bear_detector.bear_bull();
        let bull_before = self.bull_detector.bear_bull();
        self.bear_detector.record(instant, quote);
        self.bull_detector.record(instant, quote);
        let bear_now = self.bear_detector.bear_bull();
        let bull_now = self.bull_detector.bear_bull();

        match self.regime.status() {
            BearBull::Bull if bear_before == BearBull::Bull && bear_now == BearBull::Bear => {
                self.regime.transition(instant, BearBull::Bear);
            }
            BearBull::Bear if bull_before == BearBull::Bear && bull_now == BearBull::Bull => {
                self.regime.transition(instant, BearBull::Bull);
            }
            _ => {}
        }
        self.regime.report();
    }

    fn bear_bull(&self) -> BearBull {
        self.regime.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_timing::test_support::Scripted;
    use BearBull::{Bear, Bull};

    fn run(bear: &[BearBull], bull: &[BearBull]) -> Vec<BearBull> {
        let mut timing = DoubleMarketTiming::new(
            Box::new(Scripted::new(bear)),
            Box::new(Scripted::new(bull)),
        );
        let quote = Quote::from_close("IDX", 1.0);
        (0..bear.len())
            .map(|i| {
                let date = NaiveDate::from_ymd_opt(2024, 1, i as u32 + 1).unwrap();
                timing.record(date, &quote);
                timing.bear_bull()
            })
            .collect()
    }

    #[test]
    fn exits_on_bear_detector_enters_on_bull_detector() {
        let out = run(
            &[Bull, Bear, Bull, Bull, Bull],
            &[Bull, Bull, Bear, Bull, Bull],
        );
        assert_eq!(out, vec![Bull, Bear, Bear, Bull, Bull]);
    }

    #[test]
    fn bear_detector_recovery_alone_does_not_reenter() {
        let out = run(&[Bear, Bull, Bull], &[Bull, Bull, Bull]);
        assert_eq!(out, vec![Bear, Bear, Bear]);
    }

    #[test]
    fn bull_detector_alone_does_not_exit() {
        let out = run(&[Bull, Bull], &[Bear, Bear]);
        assert_eq!(out, vec![Bull, Bull]);
    }
}
