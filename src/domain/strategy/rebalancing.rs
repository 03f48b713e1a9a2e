//! Assessor-driven rotation through the best ranked instruments.
//!
//! Two cadences run side by side. A position rebalance resizes everything
//! to its target, selling positions that dropped out or grew above target.
//! A portfolio rebalance only exits positions that dropped out of the
//! targets and tops up the rest. When both fall due on the same instant the
//! position rebalance wins. Nothing is bought while the market timing is
//! BEAR; selling goes on regardless.

use chrono::NaiveDate;
use log::debug;

use crate::domain::assessor::{MomentumAssessor, MomentumAssessorConfig, QuoteAssessor};
use crate::domain::market_timing::{MarketTiming, NullMarketTiming};
use crate::domain::periodicity::{PeriodTracker, Periodicity};
use crate::domain::portfolio::Portfolio;
use crate::domain::quote::InstantQuotes;
use crate::domain::universe::{QuotesAssessor, TargetPositions, Universe};

use super::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct RebalancingConfig {
    pub position_rebalance: Periodicity,
    pub portfolio_rebalance: Periodicity,
    pub top_of_index: usize,
    /// Instruments considered; every quoted instrument when empty.
    pub universe: Vec<String>,
    /// Instrument whose quotes feed the market timing.
    pub timing_instrument: Option<String>,
    pub assessor: MomentumAssessorConfig,
}

impl Default for RebalancingConfig {
    fn default() -> Self {
        RebalancingConfig {
            position_rebalance: Periodicity::Quarterly,
            portfolio_rebalance: Periodicity::Monthly,
            top_of_index: 5,
            universe: Vec::new(),
            timing_instrument: None,
            assessor: MomentumAssessorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rebalance {
    Position,
    Portfolio,
}

#[derive(Debug)]
pub struct RebalancingStrategy {
    assessor: QuotesAssessor,
    timing: Box<dyn MarketTiming>,
    timing_instrument: Option<String>,
    position_tracker: PeriodTracker,
    portfolio_tracker: PeriodTracker,
}

impl RebalancingStrategy {
    /// Ranks with a `MomentumAssessor` per instrument.
    pub fn new(config: RebalancingConfig, timing: Box<dyn MarketTiming>) -> Self {
        let assessor_config = config.assessor.clone();
        let universe = (!config.universe.is_empty()).then(|| Universe::new(config.universe.clone()));
        let assessor = QuotesAssessor::new(
            Box::new(move |name: &str| -> Box<dyn QuoteAssessor> {
                Box::new(MomentumAssessor::new(name, assessor_config.clone()))
            }),
            universe,
            config.top_of_index,
        );
        Self::with_assessor(config, assessor, timing)
    }

    pub fn without_timing(config: RebalancingConfig) -> Self {
        Self::new(config, Box::new(NullMarketTiming))
    }

    pub fn with_assessor(
        config: RebalancingConfig,
        assessor: QuotesAssessor,
        timing: Box<dyn MarketTiming>,
    ) -> Self {
        RebalancingStrategy {
            assessor,
            timing,
            timing_instrument: config.timing_instrument,
            position_tracker: PeriodTracker::new(config.position_rebalance),
            portfolio_tracker: PeriodTracker::new(config.portfolio_rebalance),
        }
    }

    pub fn quotes_assessor(&self) -> &QuotesAssessor {
        &self.assessor
    }

    fn due(&mut self, instant: NaiveDate) -> Option<Rebalance> {
        let position = self.position_tracker.advance(instant);
        let portfolio = self.portfolio_tracker.advance(instant);
        if position {
            Some(Rebalance::Position)
        } else if portfolio {
            Some(Rebalance::Portfolio)
        } else {
            None
        }
    }

    fn rebalance(&self, kind: Rebalance, portfolio: &mut Portfolio, targets: &TargetPositions) {
        let held: Vec<(String, f64)> = portfolio
            .positions
            .values()
            .map(|p| (p.name.clone(), p.parts))
            .collect();

        for (name, parts) in held {
            if portfolio.has_pending_order(&name) {
                continue;
            }
            match (kind, targets.get(&name)) {
                (_, None) => portfolio.order(&name, -parts),
                (Rebalance::Position, Some(target)) if parts > target.parts => {
                    portfolio.order(&name, target.parts - parts)
                }
                _ => {}
            }
        }

        if !self.timing.bear_bull().is_bull() {
            return;
        }
        for target in targets.iter() {
            if portfolio.has_pending_order(&target.name) {
                continue;
            }
            let missing = target.parts - portfolio.parts(&target.name);
            if missing > 0.0 {
                portfolio.order(&target.name, missing);
            }
        }
    }
}

impl Strategy for RebalancingStrategy {
    fn name(&self) -> &str {
        "Rebalancing"
    }

    fn apply_strategy(&mut self, portfolio: &mut Portfolio, quotes: &InstantQuotes) {
        self.assessor.assess_quotes(quotes);
        if let Some(quote) = self
            .timing_instrument
            .as_deref()
            .and_then(|name| quotes.quote(name))
        {
            self.timing.record(quotes.instant, quote);
        }
        for event in self.timing.take_events() {
            debug!("universe timing turned {} on {}", event.status, event.instant);
        }

        let Some(kind) = self.due(quotes.instant) else {
            return;
        };
        let targets = self.assessor.target_positions(portfolio.nav());
        debug!(
            "{:?} rebalance on {} towards {} targets",
            kind,
            quotes.instant,
            targets.len()
        );
        self.rebalance(kind, portfolio, &targets);
    }
}
