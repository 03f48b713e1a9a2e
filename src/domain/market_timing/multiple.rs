//! AND-combination of detectors: BULL only while every detector is BULL.

use chrono::NaiveDate;

use crate::domain::quote::Quote;
use crate::domain::report::Emitter;

use super::{BearBull, MarketTiming, Regime, TimingEvent};

#[derive(Debug)]
pub struct MultipleMarketTiming {
    timings: Vec<Box<dyn MarketTiming>>,
    events: Vec<TimingEvent>,
    regime: Regime,
}

impl MultipleMarketTiming {
    pub fn new(timings: Vec<Box<dyn MarketTiming>>) -> Self {
        MultipleMarketTiming {
            timings,
            events: Vec::new(),
            regime: Regime::new("Multiple"),
        }
    }

    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.regime.set_emitter(emitter);
        self
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }
}

impl MarketTiming for MultipleMarketTiming {
    /// Events not taken before the next instant are dropped.
    fn record(&mut self, instant: NaiveDate, quote: &Quote) {
        self.events.clear();
        for timing in &mut self.timings {
            timing.record(instant, quote);
        }
        let status = if self.timings.iter().all(|t| t.bear_bull().is_bull()) {
            BearBull::Bull
        } else {
            BearBull::Bear
        };
        if self.regime.transition(instant, status) {
            self.events.push(TimingEvent { instant, status });
        }
        self.regime.report();
    }

    fn bear_bull(&self) -> BearBull {
        self.regime.status()
    }

    fn take_events(&mut self) -> Vec<TimingEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_timing::test_support::Scripted;
    use BearBull::{Bear, Bull};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn any_bear_forces_bear() {
        let mut timing = MultipleMarketTiming::new(vec![
            Box::new(Scripted::new(&[Bull, Bull, Bull])),
            Box::new(Scripted::new(&[Bull, Bear, Bull])),
        ]);
        let quote = Quote::from_close("IDX", 1.0);
        let mut out = Vec::new();
        let mut events = Vec::new();
        for d in 1..=3 {
            timing.record(day(d), &quote);
            out.push(timing.bear_bull());
            events.extend(timing.take_events());
        }
        assert_eq!(out, vec![Bull, Bear, Bull]);
        assert_eq!(
            events,
            vec![
                TimingEvent { instant: day(2), status: Bear },
                TimingEvent { instant: day(3), status: Bull },
            ]
        );
        assert!(timing.take_events().is_empty());
    }

    #[test]
    fn untaken_events_do_not_accumulate() {
        let script: Vec<BearBull> = (0..200).map(|i| if i % 2 == 0 { Bear } else { Bull }).collect();
        let mut timing = MultipleMarketTiming::new(vec![Box::new(Scripted::new(&script))]);
        let quote = Quote::from_close("IDX", 1.0);
        let start = day(1);
        for i in 0..200 {
            timing.record(start + chrono::Duration::days(i), &quote);
        }
        assert_eq!(
            timing.take_events(),
            vec![TimingEvent { instant: start + chrono::Duration::days(199), status: Bull }]
        );

        timing.record(start + chrono::Duration::days(200), &quote);
        assert!(timing.take_events().len() <= 1);
    }

    #[test]
    fn single_detectors_report_no_events() {
        let mut timing = Scripted::new(&[Bull, Bear]);
        let quote = Quote::from_close("IDX", 1.0);
        timing.record(day(1), &quote);
        timing.record(day(2), &quote);
        assert!(timing.take_events().is_empty());
    }

    #[test]
    fn empty_combination_is_bull() {
        let mut timing = MultipleMarketTiming::new(Vec::new());
        timing.record(day(1), &Quote::from_close("IDX", 1.0));
        assert!(timing.is_empty());
        assert_eq!(timing.bear_bull(), Bull);
    }
}
